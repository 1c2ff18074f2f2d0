pub mod result;
pub mod turn;

pub use result::{CellValue, Column, ColumnType, QueryResult};
pub use turn::{FailureStage, Role, Turn, TurnError};
