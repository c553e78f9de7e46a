pub mod account_service;
pub mod allocation_service;
pub mod chart_service;
pub mod currency_service;
pub mod holding_service;
pub mod inquiry_service;
pub mod price_service;
