mod bridge;
mod config;
mod launch;
mod ordering;
mod sendable;
