use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Closed set of payment providers. Selection happens once, when the record
/// is created; it is never re-derived from strings afterwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentProvider {
    /// Redirect flow: the payer approves on the provider's page, then the
    /// order is captured server-side.
    Paypal,
    /// Direct-charge flow: a payment intent is created and confirmed with a
    /// client secret, no redirect.
    Stripe,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Paypal => "paypal",
            PaymentProvider::Stripe => "stripe",
        }
    }
}

impl Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
