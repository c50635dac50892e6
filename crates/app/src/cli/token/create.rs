use clap::Args;
use storefront_app::auth::{PgAuthService, Role};
use uuid::Uuid;

use crate::cli::DatabaseArgs;

#[derive(Debug, Args)]
pub(crate) struct CreateTokenArgs {
    #[command(flatten)]
    database: DatabaseArgs,

    /// User UUID the token acts for
    #[arg(long)]
    user: Uuid,

    /// Role granted to the token: `customer` or `admin`
    #[arg(long, default_value = "customer")]
    role: Role,
}

pub(crate) async fn run(args: CreateTokenArgs) -> Result<(), String> {
    let pool = args.database.connect().await?;

    let service = PgAuthService::new(pool);

    let issued = service
        .issue_api_token(args.user.into(), args.role)
        .await
        .map_err(|error| format!("failed to create token: {error}"))?;

    println!("token_uuid: {}", issued.metadata.uuid);
    println!("user_uuid: {}", issued.metadata.user_uuid);
    println!("role: {}", issued.metadata.role);
    println!("token_version: {}", issued.metadata.version.as_i16());
    println!("token_created_at: {}", issued.metadata.created_at);
    println!("api_token: {}", issued.token);
    println!("store this token now; it is only shown once");

    Ok(())
}
