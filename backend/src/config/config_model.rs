#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub supabase: Supabase,
    pub stripe: Stripe,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    /// Megabytes.
    pub body_limit: u64,
    /// Seconds.
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct Supabase {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct Stripe {
    pub secret_key: String,
    pub webhook_secret: String,
    pub success_url: String,
    pub cancel_url: String,
    pub portal_return_url: String,
    pub prices: StripePrices,
}

#[derive(Debug, Clone, Default)]
pub struct StripePrices {
    pub monthly: String,
    pub yearly: String,
    pub monthly_plus: String,
    pub yearly_plus: String,
    pub division: String,
}

impl StripePrices {
    /// Recurring prices a user may check out with.
    pub fn subscription_prices(&self) -> [&str; 4] {
        [
            &self.monthly,
            &self.yearly,
            &self.monthly_plus,
            &self.yearly_plus,
        ]
    }

    pub fn is_subscription_price(&self, price_id: &str) -> bool {
        !price_id.is_empty() && self.subscription_prices().contains(&price_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices() -> StripePrices {
        StripePrices {
            monthly: "price_monthly".to_string(),
            yearly: "price_yearly".to_string(),
            monthly_plus: "price_monthly_plus".to_string(),
            yearly_plus: "price_yearly_plus".to_string(),
            division: "price_division".to_string(),
        }
    }

    #[test]
    fn only_recurring_prices_are_subscription_prices() {
        let prices = prices();
        assert!(prices.is_subscription_price("price_yearly_plus"));
        assert!(!prices.is_subscription_price("price_division"));
        assert!(!prices.is_subscription_price(""));
    }

    #[test]
    fn empty_configured_price_never_matches() {
        let prices = StripePrices::default();
        assert!(!prices.is_subscription_price(""));
    }
}
