//! File formats produced and consumed by the server: dispatch ticket
//! workbooks and CSV backups

pub mod backup;
pub mod ticket;

pub use backup::{parse_equipment, parse_users, write_equipment};
pub use ticket::{render_dispatch_ticket, DispatchWorkbook};
