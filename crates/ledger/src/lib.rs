//! Scripta usage ledger and payment-event reconciliation
//!
//! The two cooperating pieces at the center of the platform:
//!
//! - [`TokenLedger`] tracks the per-user consumable chat-token balance,
//!   decremented on each metered action and credited on payment events.
//!   The balance never goes negative and concurrent debits for the same
//!   user cannot both succeed past zero.
//! - [`EventReconciler`] receives payment-provider webhook deliveries,
//!   authenticates them, and maps provider event types onto ledger and
//!   subscription mutations. Deliveries are at-least-once; credits are
//!   keyed by the provider event id so replays are no-ops.

pub mod error;
pub mod ledger;
pub mod license;
pub mod packages;
pub mod subscription;
pub mod webhook;

pub use error::{LedgerError, LedgerResult, WebhookError};
pub use ledger::{grant_signup_tokens, TokenLedger};
pub use license::{LicenseClient, LicenseError};
pub use packages::TokenPackage;
pub use subscription::SubscriptionStore;
pub use webhook::{Disposition, EventReconciler};
