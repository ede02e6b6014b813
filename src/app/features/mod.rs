pub mod audit;
pub mod customers;
pub mod invoices;
pub mod leads;
pub mod onboarding;
pub mod organizations;
pub mod proposals;
pub mod users;
pub mod work_orders;
