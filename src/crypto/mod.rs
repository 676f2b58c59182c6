mod encryption;

pub use encryption::{ open_backup, seal_backup };
