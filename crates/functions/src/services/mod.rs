//! Business logic behind the HTTP functions.
//!
//! # Services
//!
//! - `checkout` - Recording orders from Stripe checkout webhooks
//! - `notifications` - Customer receipt and internal order emails
//! - `newsletter` - Signup with welcome discount, unsubscribe
//! - `email` - Mailer trait, Resend client and email templates
//! - `codes` - Readable order references and discount codes
//!
//! Services depend on the store traits in [`crate::db`] and on [`email::Mailer`],
//! never on a concrete pool or HTTP client.

pub mod checkout;
pub mod codes;
pub mod email;
pub mod newsletter;
pub mod notifications;

pub use checkout::{CheckoutError, CheckoutService, WebhookOutcome};
pub use email::{EmailError, Mailer, ResendMailer};
pub use newsletter::{NewsletterError, NewsletterService, SubscribeOutcome};
pub use notifications::{DeliveryStatus, NotificationReport, NotifyError, OrderNotifier};
