//! Command line front end for reading XP3 archives

pub mod commands;
pub mod worker;
