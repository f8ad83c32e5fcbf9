//! Plain-text rendering of each view.

use shopdesk_core::models::{Order, Product, User};
use shopdesk_core::utils::{format_optional, pad};
use shopdesk_core::View;

// Column widths
const ID_WIDTH: usize = 6;
const NAME_WIDTH: usize = 24;
const TEXT_WIDTH: usize = 30;
const MONEY_WIDTH: usize = 12;
const STATUS_WIDTH: usize = 10;

fn row(cells: &[(&str, usize)]) -> String {
    cells
        .iter()
        .map(|(text, width)| pad(text, *width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn rule(widths: &[usize]) -> String {
    widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn home() -> String {
    let mut out = String::from("Home\n\n");
    for view in [View::Orders, View::Products, View::Users, View::About] {
        out.push_str(&format!("  {:<10} shopdesk {}\n", view.title(), view.title().to_lowercase()));
    }
    out.trim_end().to_string()
}

pub fn about() -> String {
    format!(
        "shopdesk {}\nAdmin for the store API: products, orders and users.",
        env!("CARGO_PKG_VERSION")
    )
}

pub fn products_table(products: &[Product]) -> String {
    if products.is_empty() {
        return "No products.".to_string();
    }

    let widths = [ID_WIDTH, NAME_WIDTH, TEXT_WIDTH, MONEY_WIDTH, 9];
    let mut lines = vec![
        row(&[
            ("ID", widths[0]),
            ("Name", widths[1]),
            ("Description", widths[2]),
            ("Price", widths[3]),
            ("Available", widths[4]),
        ]),
        rule(&widths),
    ];
    for p in products {
        let id = p.id.to_string();
        let description = format_optional(&p.description, "");
        let price = p.price_display();
        lines.push(row(&[
            (id.as_str(), widths[0]),
            (p.name.as_str(), widths[1]),
            (description.as_str(), widths[2]),
            (price.as_str(), widths[3]),
            (p.available_display(), widths[4]),
        ]));
    }
    lines.join("\n")
}

pub fn orders_table(orders: &[Order]) -> String {
    if orders.is_empty() {
        return "No orders.".to_string();
    }

    let widths = [ID_WIDTH, NAME_WIDTH, NAME_WIDTH, STATUS_WIDTH, MONEY_WIDTH, TEXT_WIDTH];
    let mut lines = vec![
        row(&[
            ("ID", widths[0]),
            ("Customer", widths[1]),
            ("Email", widths[2]),
            ("Status", widths[3]),
            ("Total", widths[4]),
            ("Products", widths[5]),
        ]),
        rule(&widths),
    ];
    for o in orders {
        let id = o.id.to_string();
        let total = o.total_display();
        let products = o.products_display();
        lines.push(row(&[
            (id.as_str(), widths[0]),
            (o.customer_name.as_str(), widths[1]),
            (o.customer_email.as_str(), widths[2]),
            (o.status.as_str(), widths[3]),
            (total.as_str(), widths[4]),
            (products.as_str(), widths[5]),
        ]));
    }
    lines.join("\n")
}

/// Product ids to use with `orders create --product`
pub fn product_picker(products: &[Product]) -> String {
    let mut out = String::from("Products available for orders:");
    for p in products.iter().filter(|p| p.available) {
        out.push_str(&format!("\n  [{}] {} ({})", p.id, p.name, p.price_display()));
    }
    out
}

pub fn users_table(users: &[User]) -> String {
    if users.is_empty() {
        return "No users.".to_string();
    }

    let widths = [ID_WIDTH, NAME_WIDTH, TEXT_WIDTH];
    let mut lines = vec![
        row(&[("ID", widths[0]), ("Name", widths[1]), ("Email", widths[2])]),
        rule(&widths),
    ];
    for u in users {
        let id = u.id.to_string();
        let email = format_optional(&u.email, "-");
        lines.push(row(&[
            (id.as_str(), widths[0]),
            (u.display_name(), widths[1]),
            (email.as_str(), widths[2]),
        ]));
    }
    lines.join("\n")
}
