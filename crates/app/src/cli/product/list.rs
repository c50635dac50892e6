use clap::Args;
use storefront_app::{
    database::Db,
    domain::products::{PgProductsService, ProductsService},
};

use crate::cli::DatabaseArgs;

#[derive(Debug, Args)]
pub(crate) struct ListProductsArgs {
    #[command(flatten)]
    database: DatabaseArgs,
}

pub(crate) async fn run(args: ListProductsArgs) -> Result<(), String> {
    let pool = args.database.connect().await?;

    let products = PgProductsService::new(Db::new(pool))
        .list_products()
        .await
        .map_err(|error| format!("failed to list products: {error}"))?;

    for product in products {
        println!(
            "{}\t{}\tprice={}\tstock={}",
            product.uuid, product.name, product.price, product.stock
        );
    }

    Ok(())
}
