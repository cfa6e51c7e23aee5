// ABOUTME: SeaORM entities module for database models
// ABOUTME: Exports the user and checkup entity definitions

pub mod checkup;
pub mod user;
