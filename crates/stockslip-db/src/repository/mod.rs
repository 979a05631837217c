//! # Repository Module
//!
//! Database repositories for Stockslip.
//!
//! ## Two Calling Conventions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Pool-level (own connection, own transaction when writing)              │
//! │                                                                         │
//! │     db.items().insert(&new_item)                                       │
//! │     db.slips().get_by_id(id)                                           │
//! │                                                                         │
//! │  Connection-level (caller's UnitOfWork)                                 │
//! │                                                                         │
//! │     ledger.reserve(uow.conn(), "Aster Cover", 3)                       │
//! │     SlipRepository::insert(uow.conn(), &slip)                          │
//! │     IncomeRepository::deactivate_for_slip(uow.conn(), &slip, now)       │
//! │                                                                         │
//! │  Everything a fulfillment request writes goes through the second form, │
//! │  so it lands in one transaction.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ItemRepository`](item::ItemRepository) - Item catalog intake and lookups
//! - [`StockLedger`](ledger::StockLedger) - Resolve / reserve / release stock
//! - [`SlipRepository`](slip::SlipRepository) - Sale records and their lines
//! - [`IncomeRepository`](income::IncomeRepository) - Income ledger mirror

pub mod income;
pub mod item;
pub mod ledger;
pub mod slip;
