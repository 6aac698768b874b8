pub mod distributor;
pub mod email;
pub mod render;
pub mod subscribers;

pub use distributor::{DeliveryOutcome, DeliveryReport, DistributeError, Distributor};
pub use email::{MailTransport, SmtpMailer};
pub use render::{render_digest, DigestEmail};
pub use subscribers::{CsvSubscriberStore, SubscriberStore};
