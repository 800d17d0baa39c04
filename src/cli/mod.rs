mod menu;

pub use menu::run;
