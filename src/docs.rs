use crate::api::budget::{BudgetListResponse, BudgetQuery, CreateBudget, UpdateBudget};
use crate::api::employee::{
    CreateEmployee, EmployeeListResponse, EmployeeQuery, UpdateEmployee,
};
use crate::api::employee_request::{
    CreateEmployeeRequest, EmployeeRequestListResponse, EmployeeRequestQuery, ProcessAction,
    ProcessEmployeeRequest,
};
use crate::api::submission::{
    CreateSubmission, SubmissionDetail, SubmissionKind, SubmissionListResponse, SubmissionQuery,
    UpdateSubmission, ValidateSubmission,
};
use crate::api::user::{CreateUser, UpdateUser, UserListResponse, UserQuery, UserResponse};
use crate::domain::workflow::{Decision, ValidationLevel};
use crate::model::conge::Conge;
use crate::model::employee::Employee;
use crate::model::employee_request::EmployeeRequest;
use crate::model::monthly_budget::MonthlyBudget;
use crate::model::prime::Prime;
use crate::model::submission::EvpSubmission;
use crate::model::validation_history::ValidationHistory;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "EVP Workflow API",
        version = "1.0.0",
        description = r#"
## EVP Compensation Workflow

Backend for the employer's compensation-submission program (EVP): bonus
("Prime") and leave-indemnity ("Conge") requests routed through a
multi-level approval chain.

### Key Features
- **Employee Management**: create, update, list and view employee records
- **EVP Submissions**: one Prime or Conge sub-record per submission, with
  eagerly recomputed amounts mirrored onto the aggregate
- **Approval Chain**: Service, Division then RH validation with an
  append-only audit history
- **Employee Requests**: approve/reject workflow for onboarding new
  employees
- **Monthly Budgets**: planned vs realized amounts per division

### Security
All endpoints outside `/auth` require **JWT Bearer authentication**; the
token's role decides which approval level the caller may act at.
"#,
    ),
    paths(
        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::submission::create_submission,
        crate::api::submission::list_submissions,
        crate::api::submission::get_submission,
        crate::api::submission::update_submission,
        crate::api::submission::submit_submission,
        crate::api::submission::validate_submission,
        crate::api::submission::delete_submission,

        crate::api::employee_request::create_request,
        crate::api::employee_request::list_requests,
        crate::api::employee_request::process_request,

        crate::api::user::create_user,
        crate::api::user::list_users,
        crate::api::user::update_user,
        crate::api::user::delete_user,

        crate::api::budget::create_budget,
        crate::api::budget::list_budgets,
        crate::api::budget::update_budget,
        crate::api::budget::delete_budget
    ),
    components(
        schemas(
            Employee,
            CreateEmployee,
            UpdateEmployee,
            EmployeeQuery,
            EmployeeListResponse,

            EvpSubmission,
            Prime,
            Conge,
            ValidationHistory,
            SubmissionKind,
            CreateSubmission,
            UpdateSubmission,
            ValidateSubmission,
            Decision,
            ValidationLevel,
            SubmissionQuery,
            SubmissionListResponse,
            SubmissionDetail,

            EmployeeRequest,
            CreateEmployeeRequest,
            ProcessAction,
            ProcessEmployeeRequest,
            EmployeeRequestQuery,
            EmployeeRequestListResponse,

            CreateUser,
            UpdateUser,
            UserResponse,
            UserQuery,
            UserListResponse,

            MonthlyBudget,
            CreateBudget,
            UpdateBudget,
            BudgetQuery,
            BudgetListResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Employee", description = "Employee management APIs"),
        (name = "EVP", description = "EVP submission and approval APIs"),
        (name = "EmployeeRequest", description = "Employee onboarding request APIs"),
        (name = "User", description = "User administration APIs"),
        (name = "Budget", description = "Monthly division budget APIs"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
