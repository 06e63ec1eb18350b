use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::role::Role;

/// Closed status set for Prime/Conge sub-records. The database stores the
/// French display string; `FromStr` parses it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum SubmissionStatus {
    #[strum(serialize = "En attente")]
    EnAttente,
    #[strum(serialize = "Soumis")]
    Soumis,
    #[strum(serialize = "Validé (Service)")]
    ValideService,
    #[strum(serialize = "Validé (Division)")]
    ValideDivision,
    #[strum(serialize = "Approuvé (RH)")]
    ApprouveRh,
    #[strum(serialize = "Rejeté")]
    Rejete,
}

impl SubmissionStatus {
    /// Parses a persisted status string. An unknown value means the row was
    /// written outside the application and is treated as corruption.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        Self::from_str(raw).map_err(|_| {
            tracing::error!(statut = raw, "Unknown submission status in storage");
            AppError::Internal("Internal Server Error".into())
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionStatus::ApprouveRh | SubmissionStatus::Rejete)
    }
}

/// Sequential approval stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    Service,
    Division,
    #[strum(serialize = "RH")]
    Rh,
}

/// Caller's intent on the validate endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

/// Audit-trail action recorded in validation_history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum HistoryAction {
    #[strum(serialize = "Validé")]
    Valide,
    #[strum(serialize = "Rejeté")]
    Rejete,
    #[strum(serialize = "Approuvé")]
    Approuve,
}

/// Mutable workflow fields of a submission, read inside the transaction
/// before a transition is attempted.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowState {
    pub statut: SubmissionStatus,
    pub valide_service: bool,
    pub valide_division: bool,
}

/// Everything a single accepted transition writes: the new sub-record
/// status, the submission's validation flags, and exactly one history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub statut: SubmissionStatus,
    pub valide_service: bool,
    pub valide_division: bool,
    pub action: HistoryAction,
    pub niveau: ValidationLevel,
}

/// Whether a role may act at the given approval level.
pub fn role_can_act(role: Role, niveau: ValidationLevel) -> bool {
    match (role, niveau) {
        (Role::Administrateur, _) => true,
        (Role::ResponsableService, ValidationLevel::Service) => true,
        (Role::ResponsableDivision, ValidationLevel::Division) => true,
        (Role::Rh, ValidationLevel::Rh) => true,
        _ => false,
    }
}

/// The submit transition (`En attente` → `Soumis`). Not part of the
/// validation chain and not history-logged.
pub fn submit(state: &WorkflowState) -> Result<SubmissionStatus, AppError> {
    match state.statut {
        SubmissionStatus::EnAttente => Ok(SubmissionStatus::Soumis),
        statut => Err(AppError::InvalidState(format!(
            "Cannot submit while status is '{statut}'"
        ))),
    }
}

/// Applies one approval-chain transition.
///
/// Role scope is checked first (`ForbiddenError` on mismatch), then the
/// transition table. A rejection is reachable from any non-terminal state
/// and never rolls back validation booleans already set.
pub fn apply(
    state: &WorkflowState,
    role: Role,
    niveau: ValidationLevel,
    decision: Decision,
) -> Result<Transition, AppError> {
    if !role_can_act(role, niveau) {
        return Err(AppError::Forbidden(format!(
            "Role not allowed to act at the {niveau} level"
        )));
    }

    match decision {
        Decision::Reject => {
            if state.statut.is_terminal() {
                return Err(AppError::InvalidState(format!(
                    "Cannot reject while status is '{}'",
                    state.statut
                )));
            }
            Ok(Transition {
                statut: SubmissionStatus::Rejete,
                valide_service: state.valide_service,
                valide_division: state.valide_division,
                action: HistoryAction::Rejete,
                niveau,
            })
        }
        Decision::Approve => {
            if state.statut == SubmissionStatus::Rejete {
                return Err(AppError::InvalidState(
                    "Submission has been rejected".into(),
                ));
            }

            let already_validated = match niveau {
                ValidationLevel::Service => state.valide_service,
                ValidationLevel::Division => state.valide_division,
                ValidationLevel::Rh => state.statut == SubmissionStatus::ApprouveRh,
            };
            if already_validated {
                return Err(AppError::InvalidState(format!(
                    "{niveau} level already validated"
                )));
            }

            let (expected, next, action) = match niveau {
                ValidationLevel::Service => (
                    SubmissionStatus::Soumis,
                    SubmissionStatus::ValideService,
                    HistoryAction::Valide,
                ),
                ValidationLevel::Division => (
                    SubmissionStatus::ValideService,
                    SubmissionStatus::ValideDivision,
                    HistoryAction::Valide,
                ),
                ValidationLevel::Rh => (
                    SubmissionStatus::ValideDivision,
                    SubmissionStatus::ApprouveRh,
                    HistoryAction::Approuve,
                ),
            };

            if state.statut != expected {
                return Err(AppError::InvalidState(format!(
                    "Cannot validate at the {niveau} level while status is '{}'",
                    state.statut
                )));
            }

            Ok(Transition {
                statut: next,
                valide_service: state.valide_service || niveau == ValidationLevel::Service,
                valide_division: state.valide_division || niveau == ValidationLevel::Division,
                action,
                niveau,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(statut: SubmissionStatus, service: bool, division: bool) -> WorkflowState {
        WorkflowState {
            statut,
            valide_service: service,
            valide_division: division,
        }
    }

    #[test]
    fn status_strings_round_trip() {
        for statut in [
            SubmissionStatus::EnAttente,
            SubmissionStatus::Soumis,
            SubmissionStatus::ValideService,
            SubmissionStatus::ValideDivision,
            SubmissionStatus::ApprouveRh,
            SubmissionStatus::Rejete,
        ] {
            assert_eq!(SubmissionStatus::parse(&statut.to_string()).unwrap(), statut);
        }
        assert!(SubmissionStatus::parse("n'importe quoi").is_err());
    }

    #[test]
    fn history_strings_match_audit_vocabulary() {
        assert_eq!(HistoryAction::Valide.to_string(), "Validé");
        assert_eq!(HistoryAction::Rejete.to_string(), "Rejeté");
        assert_eq!(HistoryAction::Approuve.to_string(), "Approuvé");
        assert_eq!(ValidationLevel::Rh.to_string(), "RH");
    }

    #[test]
    fn full_approval_chain() {
        let s = state(SubmissionStatus::Soumis, false, false);

        let t1 = apply(
            &s,
            Role::ResponsableService,
            ValidationLevel::Service,
            Decision::Approve,
        )
        .unwrap();
        assert_eq!(t1.statut, SubmissionStatus::ValideService);
        assert!(t1.valide_service);
        assert!(!t1.valide_division);
        assert_eq!(t1.action, HistoryAction::Valide);

        let s = state(t1.statut, t1.valide_service, t1.valide_division);
        let t2 = apply(
            &s,
            Role::ResponsableDivision,
            ValidationLevel::Division,
            Decision::Approve,
        )
        .unwrap();
        assert_eq!(t2.statut, SubmissionStatus::ValideDivision);
        assert!(t2.valide_service && t2.valide_division);

        let s = state(t2.statut, t2.valide_service, t2.valide_division);
        let t3 = apply(&s, Role::Rh, ValidationLevel::Rh, Decision::Approve).unwrap();
        assert_eq!(t3.statut, SubmissionStatus::ApprouveRh);
        assert_eq!(t3.action, HistoryAction::Approuve);
    }

    #[test]
    fn role_must_match_level() {
        let s = state(SubmissionStatus::Soumis, false, false);

        let err = apply(
            &s,
            Role::ResponsableDivision,
            ValidationLevel::Service,
            Decision::Approve,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = apply(&s, Role::Gestionnaire, ValidationLevel::Service, Decision::Reject)
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        // Administrateur may act at any level.
        assert!(apply(&s, Role::Administrateur, ValidationLevel::Service, Decision::Approve).is_ok());
    }

    #[test]
    fn out_of_order_approval_is_rejected() {
        // Division before Service.
        let s = state(SubmissionStatus::Soumis, false, false);
        let err = apply(
            &s,
            Role::ResponsableDivision,
            ValidationLevel::Division,
            Decision::Approve,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        // RH before Division.
        let s = state(SubmissionStatus::ValideService, true, false);
        let err = apply(&s, Role::Rh, ValidationLevel::Rh, Decision::Approve).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        // Service approval requires Soumis, not En attente.
        let s = state(SubmissionStatus::EnAttente, false, false);
        let err = apply(
            &s,
            Role::ResponsableService,
            ValidationLevel::Service,
            Decision::Approve,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn revalidating_a_validated_level_fails() {
        let s = state(SubmissionStatus::ValideService, true, false);
        let err = apply(
            &s,
            Role::ResponsableService,
            ValidationLevel::Service,
            Decision::Approve,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn rejected_is_terminal() {
        // Once rejected, no further validate call succeeds at any level.
        let s = state(SubmissionStatus::Rejete, true, false);
        for niveau in [
            ValidationLevel::Service,
            ValidationLevel::Division,
            ValidationLevel::Rh,
        ] {
            let err = apply(&s, Role::Administrateur, niveau, Decision::Approve).unwrap_err();
            assert!(matches!(err, AppError::InvalidState(_)));
            let err = apply(&s, Role::Administrateur, niveau, Decision::Reject).unwrap_err();
            assert!(matches!(err, AppError::InvalidState(_)));
        }
    }

    #[test]
    fn approved_is_terminal_for_reject() {
        let s = state(SubmissionStatus::ApprouveRh, true, true);
        let err = apply(&s, Role::Rh, ValidationLevel::Rh, Decision::Reject).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn reject_keeps_validation_booleans() {
        // Booleans are audit state, not rolled back by a rejection.
        let s = state(SubmissionStatus::ValideDivision, true, true);
        let t = apply(&s, Role::Rh, ValidationLevel::Rh, Decision::Reject).unwrap();
        assert_eq!(t.statut, SubmissionStatus::Rejete);
        assert!(t.valide_service && t.valide_division);
        assert_eq!(t.action, HistoryAction::Rejete);
    }

    #[test]
    fn reject_reachable_from_every_non_terminal_state() {
        for statut in [
            SubmissionStatus::EnAttente,
            SubmissionStatus::Soumis,
            SubmissionStatus::ValideService,
            SubmissionStatus::ValideDivision,
        ] {
            let s = state(statut, false, false);
            let t = apply(
                &s,
                Role::ResponsableService,
                ValidationLevel::Service,
                Decision::Reject,
            )
            .unwrap();
            assert_eq!(t.statut, SubmissionStatus::Rejete);
        }
    }

    #[test]
    fn one_history_action_per_accepted_transition() {
        // Each accepted transition carries exactly one audit action, so the
        // history row count always equals the number of applied transitions.
        let mut s = state(SubmissionStatus::Soumis, false, false);
        let mut actions = Vec::new();

        for (role, niveau) in [
            (Role::ResponsableService, ValidationLevel::Service),
            (Role::ResponsableDivision, ValidationLevel::Division),
            (Role::Rh, ValidationLevel::Rh),
        ] {
            let t = apply(&s, role, niveau, Decision::Approve).unwrap();
            actions.push(t.action);
            s = state(t.statut, t.valide_service, t.valide_division);
        }

        assert_eq!(
            actions,
            vec![
                HistoryAction::Valide,
                HistoryAction::Valide,
                HistoryAction::Approuve
            ]
        );

        // A refused transition produces no action at all.
        assert!(apply(&s, Role::Rh, ValidationLevel::Rh, Decision::Approve).is_err());
        assert_eq!(actions.len(), 3);
    }

    #[test]
    fn submit_only_from_en_attente() {
        let s = state(SubmissionStatus::EnAttente, false, false);
        assert_eq!(submit(&s).unwrap(), SubmissionStatus::Soumis);

        for statut in [
            SubmissionStatus::Soumis,
            SubmissionStatus::ValideService,
            SubmissionStatus::Rejete,
        ] {
            let s = state(statut, false, false);
            assert!(matches!(submit(&s), Err(AppError::InvalidState(_))));
        }
    }
}
