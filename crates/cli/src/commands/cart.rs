//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart
//! wearables show
//!
//! # Add two units of product 7
//! wearables add 7 --name "Pulse Band" --price 1499 --quantity 2
//!
//! # Same, as user 42 (runs the login merge first)
//! wearables --user 42 --email shopper@example.com add 7 --name "Pulse Band" --price 1499
//! ```

use rust_decimal::Decimal;
use wearables_core::{CartItem, Price, ProductId, ProductSummary};
use wearables_storefront::Storefront;
use wearables_storefront::cart::CartState;
use wearables_storefront::order::OrderSummary;

use super::CliError;

/// Product details for `add`. There is no catalog lookup; the caller names
/// the product.
pub struct NewItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: String,
    pub image: String,
    pub quantity: i64,
}

/// Print the cart.
pub fn show(storefront: &Storefront) {
    print_cart(&storefront.cart().snapshot());
}

/// Add a product to the cart.
///
/// # Errors
///
/// Returns an error if the price is invalid or the backend call fails.
pub async fn add(storefront: &Storefront, item: NewItem) -> Result<(), CliError> {
    let price = item
        .price
        .trim()
        .parse::<Decimal>()
        .ok()
        .and_then(|amount| Price::new(amount).ok())
        .ok_or_else(|| CliError::InvalidPrice(item.price.clone()))?;

    let product = ProductSummary {
        id: item.product_id,
        name: item.name,
        price,
        image: item.image,
    };
    storefront.actions().add(&product, item.quantity).await?;
    show(storefront);
    Ok(())
}

/// Set a line's quantity.
///
/// # Errors
///
/// Returns an error if the backend call fails.
pub async fn update(
    storefront: &Storefront,
    product_id: ProductId,
    quantity: i64,
) -> Result<(), CliError> {
    storefront
        .actions()
        .change_quantity(product_id, quantity)
        .await?;
    show(storefront);
    Ok(())
}

/// Remove a line.
///
/// # Errors
///
/// Returns an error if the backend call fails.
pub async fn remove(storefront: &Storefront, product_id: ProductId) -> Result<(), CliError> {
    storefront.actions().remove(product_id).await?;
    show(storefront);
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if the backend call fails.
pub async fn clear(storefront: &Storefront) -> Result<(), CliError> {
    storefront.actions().clear().await?;
    show(storefront);
    Ok(())
}

/// Print the order summary if the cart can be checked out.
///
/// # Errors
///
/// Returns an error if the cart is empty, nobody is signed in, or the login
/// merge has not completed.
pub fn checkout(storefront: &Storefront) -> Result<(), CliError> {
    let summary = storefront.actions().begin_checkout()?;
    print_summary(&summary);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_cart(state: &CartState) {
    if state.items.is_empty() {
        println!("Your cart is empty");
        return;
    }

    match state.cart_id {
        Some(cart_id) => println!("Cart #{cart_id}"),
        None => println!("Guest cart"),
    }
    for item in &state.items {
        println!("  {}", format_line(item));
    }
    println!(
        "{} item(s), total {}",
        state.total_items(),
        state.total_price().display(wearables_core::CurrencyCode::INR)
    );
}

fn format_line(item: &CartItem) -> String {
    format!(
        "{} x {} (#{}) @ {} = {}",
        item.quantity,
        item.name,
        item.product_id,
        item.unit_price,
        item.line_total()
    )
}

#[allow(clippy::print_stdout)]
fn print_summary(summary: &OrderSummary) {
    println!("Order summary ({} item(s))", summary.item_count);
    println!("  Subtotal  {}", summary.format(summary.subtotal));
    if summary.free_shipping() {
        println!("  Shipping  Free");
    } else {
        println!("  Shipping  {}", summary.format(summary.shipping));
    }
    println!("  Tax (18%) {}", summary.format(summary.tax));
    println!("  Total     {}", summary.format(summary.total));
}
