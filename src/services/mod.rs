// Return-and-reorder workflow
pub mod returns;

// Order reads and deliveries
pub mod orders;
pub mod purchase_requests;

// Warehouse stock ledger and custody
pub mod stock;

// Audit log reads
pub mod audit;
