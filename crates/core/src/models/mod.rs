pub mod bond;
pub mod chart;
pub mod database;
pub mod deposit;
pub mod history;
pub mod inquiry;
pub mod money;
pub mod news;
pub mod price;
pub mod report;
pub mod settings;
pub mod stock;
pub mod user;
