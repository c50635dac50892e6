use clap::Args;
use storefront_app::{
    database::Db,
    domain::products::{
        PgProductsService, ProductsService,
        data::NewProduct,
        records::ProductUuid,
    },
};

use crate::cli::DatabaseArgs;

#[derive(Debug, Args)]
pub(crate) struct CreateProductArgs {
    #[command(flatten)]
    database: DatabaseArgs,

    /// Product display name
    #[arg(long)]
    name: String,

    /// Unit price in minor currency units
    #[arg(long)]
    price: u64,

    /// Units in stock
    #[arg(long, default_value_t = 0)]
    stock: u64,
}

pub(crate) async fn run(args: CreateProductArgs) -> Result<(), String> {
    if args.name.trim().is_empty() {
        return Err("name cannot be empty".to_string());
    }

    let pool = args.database.connect().await?;

    let product = PgProductsService::new(Db::new(pool))
        .create_product(NewProduct {
            uuid: ProductUuid::new(),
            name: args.name,
            price: args.price,
            stock: args.stock,
        })
        .await
        .map_err(|error| format!("failed to create product: {error}"))?;

    println!("product_uuid: {}", product.uuid);
    println!("name: {}", product.name);
    println!("price: {}", product.price);
    println!("stock: {}", product.stock);

    Ok(())
}
