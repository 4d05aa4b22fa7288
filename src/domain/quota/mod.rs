pub mod clock;
pub mod error;
pub mod gate;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::QuotaServiceError;
pub use gate::Decision;
pub use service::{QuotaService, QuotaServiceApi};
