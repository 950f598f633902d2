pub mod checkout;
pub mod gateway;
pub mod ledger;

pub use checkout::{
    CheckoutDetails, CheckoutRedirect, CheckoutService, PaymentOutcome, RandomReferenceGenerator,
    ReferenceGenerator,
};
pub use gateway::{
    GatewayHandle, InitializeTransaction, PaymentGateway, PaystackClient, TransactionMetadata,
    VerifiedTransaction,
};
pub use ledger::{OpenOrder, OrderLedger};
