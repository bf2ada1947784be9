//! Flutter bridge for the StockDesk state core.

pub mod api;
