use anyhow::{Context, Result};

use super::config_model::{Database, DotEnvyConfig, Server, Stripe, StripePrices, Supabase};

const DEFAULT_MAX_DB_CONNECTIONS: u32 = 10;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = Server {
        port: required("SERVER_PORT")?.parse()?,
        body_limit: required("SERVER_BODY_LIMIT")?.parse()?,
        timeout: required("SERVER_TIMEOUT")?.parse()?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_connections: match std::env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => raw.parse().context("DATABASE_MAX_CONNECTIONS is invalid")?,
            Err(_) => DEFAULT_MAX_DB_CONNECTIONS,
        },
    };

    let supabase = Supabase {
        jwt_secret: required("SUPABASE_JWT_SECRET")?,
    };

    let success_url = required("STRIPE_SUCCESS_URL")?;
    let portal_return_url =
        std::env::var("STRIPE_PORTAL_RETURN_URL").unwrap_or_else(|_| success_url.clone());

    let stripe = Stripe {
        secret_key: required("STRIPE_SECRET_KEY")?,
        webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
        success_url,
        cancel_url: required("STRIPE_CANCEL_URL")?,
        portal_return_url,
        prices: StripePrices {
            monthly: required("STRIPE_PRICE_MONTHLY")?,
            yearly: required("STRIPE_PRICE_YEARLY")?,
            monthly_plus: optional("STRIPE_PRICE_MONTHLY_PLUS"),
            yearly_plus: optional("STRIPE_PRICE_YEARLY_PLUS"),
            division: required("STRIPE_PRICE_DIVISION")?,
        },
    };

    Ok(DotEnvyConfig {
        server,
        database,
        supabase,
        stripe,
    })
}

pub fn get_supabase_jwt_secret() -> Result<String> {
    dotenvy::dotenv().ok();

    required("SUPABASE_JWT_SECRET")
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} is invalid"))
}

fn optional(key: &str) -> String {
    std::env::var(key).unwrap_or_default()
}
