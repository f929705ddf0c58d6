// src/lib.rs

// 1. Data Structures (The "Nouns")
pub mod models;

// 2. Error Taxonomy
pub mod errors;

// 3. Interfaces (The "Contract")
pub mod traits;

// 4. Wire Codec (envelopes <-> typed frames)
pub mod codec;

// 5. Session & Connection (The "Plumbing")
pub mod connection;

// 6. Instrument Discovery (The "Catalog")
pub mod catalog;

// 7. Indicator & Sizing Logic (The "Brains")
pub mod strategy;

// 8. Order Placement & Tracking (The "Orchestrator")
pub mod executor;

// 9. Configuration
pub mod config;
