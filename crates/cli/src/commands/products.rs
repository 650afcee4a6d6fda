//! Catalog commands.

use duodude_core::{Product, ProductId, format_price};
use duodude_storefront::api::ProductQuery;

use super::{CommandError, ProductsAction, print_json};
use crate::context::Context;

pub async fn run(ctx: &Context, action: ProductsAction, json: bool) -> Result<(), CommandError> {
    match action {
        ProductsAction::List {
            sort,
            limit,
            category,
        } => {
            let query = ProductQuery {
                sort,
                limit,
                category,
            };
            let products = ctx.catalog.list_products(&query).await?;
            print_products(&products, json)
        }
        ProductsAction::Featured => {
            let products = ctx.catalog.featured_products().await?;
            print_products(&products, json)
        }
        ProductsAction::Show { id } => {
            let product = ctx.catalog.get_product(&ProductId::new(id)).await?;
            if json {
                print_json(&product)
            } else {
                print_product(&product);
                Ok(())
            }
        }
    }
}

#[allow(clippy::print_stdout)]
fn print_products(products: &[Product], json: bool) -> Result<(), CommandError> {
    if json {
        return print_json(products);
    }
    if products.is_empty() {
        println!("No products found.");
    }
    for product in products {
        let badge = if product.is_new { " (new)" } else { "" };
        println!(
            "{:<24} {:<30} {:>12}{badge}",
            product.id.as_str(),
            product.name,
            format_price(product.price),
        );
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_product(product: &Product) {
    println!("{}  ({})", product.name, product.id);
    println!("Price:    {}", format_price(product.price));
    if !product.category.is_empty() {
        println!("Category: {}", product.category);
    }
    if !product.sizes.is_empty() {
        println!("Sizes:    {}", product.sizes.join(", "));
    }
    if !product.colors.is_empty() {
        println!("Colors:   {}", product.colors.join(", "));
    }
    if let Some(rating) = product.rating {
        println!("Rating:   {rating:.1}");
    }
    if let Some(stock) = product.stock {
        println!("In stock: {stock}");
    }
    if let Some(image) = product.primary_image() {
        println!("Image:    {image}");
    }
    if !product.description.is_empty() {
        println!();
        println!("{}", product.description);
    }
}
