//! Velvet Rope - Turn-Based Persuasion Game Engine
//!
//! This crate implements the engine behind a social persuasion game: the
//! player trades messages with Viktor, the doorman of an exclusive club,
//! while a hidden judge scores every message and a cumulative trust score
//! decides whether the rope ever opens.
//!
//! The engine is a library. HTTP routing, durable persistence, and the
//! text-generation service live behind ports; the crate ships an
//! OpenAI-compatible generator adapter and in-memory test doubles.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
