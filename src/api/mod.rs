pub mod budget;
pub mod employee;
pub mod employee_request;
pub mod submission;
pub mod user;
