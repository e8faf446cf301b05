mod prices;
mod stripe;

pub use prices::PriceCache;
pub use stripe::{
    CheckoutSession, CustomerDetails, Expandable, StripeClient, StripeCustomer, StripeInvoice,
    StripeSubscription, StripeWebhookEvent,
};
