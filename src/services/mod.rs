pub mod ledger;
pub mod reservation;

pub use ledger::LedgerService;
pub use reservation::{ReservationService, StockOperation};
