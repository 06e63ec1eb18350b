pub mod conge;
pub mod employee;
pub mod employee_request;
pub mod monthly_budget;
pub mod prime;
pub mod role;
pub mod submission;
pub mod validation_history;
