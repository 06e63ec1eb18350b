use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::domain::calcul;
use crate::domain::workflow::{self, Decision, SubmissionStatus, ValidationLevel, WorkflowState};
use crate::error::AppError;
use crate::model::conge::Conge;
use crate::model::prime::Prime;
use crate::model::role::Role;
use crate::model::submission::EvpSubmission;
use crate::model::validation_history::ValidationHistory;
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionKind {
    Prime,
    Conge,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateSubmission {
    #[schema(example = 1)]
    pub employee_id: u64,
    #[serde(rename = "type")]
    #[schema(example = "prime")]
    pub kind: SubmissionKind,
}

/// Field updates for the attached sub-record. The handler routes by the
/// submission's `is_prime`/`is_conge` flags; fields for the other kind are
/// rejected as validation errors.
#[derive(Default, Deserialize, ToSchema)]
pub struct UpdateSubmission {
    // Prime fields
    #[schema(example = "100.00", value_type = Option<String>)]
    pub taux_monetaire: Option<Decimal>,
    #[schema(example = "Groupe A")]
    pub groupe: Option<String>,
    #[schema(example = 2)]
    pub nombre_postes: Option<u32>,
    #[schema(example = 10)]
    pub score_equipe: Option<i32>,
    #[schema(example = 5)]
    pub note_hierarchique: Option<i32>,
    #[schema(example = 5)]
    pub score_collectif: Option<i32>,

    // Conge fields
    #[schema(example = "2026-01-30", format = "date", value_type = Option<String>)]
    pub date_debut: Option<NaiveDate>,
    #[schema(example = "2026-02-01", format = "date", value_type = Option<String>)]
    pub date_fin: Option<NaiveDate>,
    #[schema(example = 2)]
    pub tranche: Option<u32>,
    #[schema(example = "50.00", value_type = Option<String>)]
    pub indemnite_forfaitaire: Option<Decimal>,
    pub avance_conge: Option<bool>,
    #[schema(example = "200.00", value_type = Option<String>)]
    pub montant_avance: Option<Decimal>,
}

impl UpdateSubmission {
    fn touches_prime(&self) -> bool {
        self.taux_monetaire.is_some()
            || self.groupe.is_some()
            || self.nombre_postes.is_some()
            || self.score_equipe.is_some()
            || self.note_hierarchique.is_some()
            || self.score_collectif.is_some()
    }

    fn touches_conge(&self) -> bool {
        self.date_debut.is_some()
            || self.date_fin.is_some()
            || self.tranche.is_some()
            || self.indemnite_forfaitaire.is_some()
            || self.avance_conge.is_some()
            || self.montant_avance.is_some()
    }
}

#[derive(Deserialize, ToSchema)]
pub struct ValidateSubmission {
    #[schema(example = "approve")]
    pub action: Decision,
    #[schema(example = "service")]
    pub niveau: ValidationLevel,
    #[schema(example = "Montant vérifié")]
    pub commentaire: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct SubmissionQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 20)]
    pub per_page: Option<u32>,
    /// Filter by employee
    pub employee_id: Option<u64>,
    /// Filter by sub-record kind
    #[serde(rename = "type")]
    pub kind: Option<SubmissionKind>,
}

#[derive(Serialize, ToSchema)]
pub struct SubmissionListResponse {
    pub data: Vec<EvpSubmission>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
pub struct SubmissionDetail {
    #[serde(flatten)]
    pub submission: EvpSubmission,
    pub prime: Option<Prime>,
    pub conge: Option<Conge>,
    pub history: Vec<ValidationHistory>,
}

async fn fetch_submission(pool: &MySqlPool, id: u64) -> Result<EvpSubmission, AppError> {
    sqlx::query_as::<_, EvpSubmission>("SELECT * FROM evp_submissions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Submission {id} not found")))
}

/// Table holding the sub-record of a submission, derived from the flags.
fn sub_record_table(submission: &EvpSubmission) -> Result<&'static str, AppError> {
    match (submission.is_prime, submission.is_conge) {
        (true, false) => Ok("primes"),
        (false, true) => Ok("conges"),
        _ => {
            tracing::error!(
                submission_id = submission.id,
                "Submission flags do not identify exactly one sub-record"
            );
            Err(AppError::Internal("Internal Server Error".into()))
        }
    }
}

async fn fetch_sub_record_status(
    pool: &MySqlPool,
    submission: &EvpSubmission,
) -> Result<SubmissionStatus, AppError> {
    let table = sub_record_table(submission)?;
    let sql = format!("SELECT statut FROM {table} WHERE submission_id = ?");
    let raw = sqlx::query_scalar::<_, String>(&sql)
        .bind(submission.id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| {
            tracing::error!(submission_id = submission.id, "Sub-record row missing");
            AppError::Internal("Internal Server Error".into())
        })?;
    SubmissionStatus::parse(&raw)
}

/// Create an EVP submission with its empty Prime or Conge sub-record.
#[utoipa::path(
    post,
    path = "/api/evp/submissions",
    request_body = CreateSubmission,
    responses(
        (status = 201, description = "Submission created", body = Object, example = json!({
            "id": 1,
            "message": "Submission created",
            "statut": "En attente"
        })),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Employee already has an open submission"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "EVP",
    security(("bearer_auth" = []))
)]
pub async fn create_submission(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateSubmission>,
) -> Result<HttpResponse, AppError> {
    let employee_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM employees WHERE id = ?)")
            .bind(payload.employee_id)
            .fetch_one(pool.get_ref())
            .await?;

    if !employee_exists {
        return Err(AppError::NotFound(format!(
            "Employee {} not found",
            payload.employee_id
        )));
    }

    // Policy knob: by default one open submission per employee.
    if !config.evp_allow_parallel {
        let has_open = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM evp_submissions s
                LEFT JOIN primes p ON p.submission_id = s.id
                LEFT JOIN conges c ON c.submission_id = s.id
                WHERE s.employee_id = ?
                  AND COALESCE(p.statut, c.statut) NOT IN ('Approuvé (RH)', 'Rejeté')
            )
            "#,
        )
        .bind(payload.employee_id)
        .fetch_one(pool.get_ref())
        .await?;

        if has_open {
            return Err(AppError::Conflict(format!(
                "Employee {} already has an open submission",
                payload.employee_id
            )));
        }
    }

    let (is_prime, is_conge) = match payload.kind {
        SubmissionKind::Prime => (true, false),
        SubmissionKind::Conge => (false, true),
    };

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO evp_submissions
            (employee_id, user_id, is_prime, is_conge, montant_calcule)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.employee_id)
    .bind(auth.user_id)
    .bind(is_prime)
    .bind(is_conge)
    // Bonus amounts default to 0.00, leave indemnities stay unset.
    .bind(if is_prime { Some(Decimal::new(0, 2)) } else { None })
    .execute(&mut *tx)
    .await?;

    let submission_id = result.last_insert_id();

    match payload.kind {
        SubmissionKind::Prime => {
            sqlx::query(
                "INSERT INTO primes (submission_id, montant_calcule, statut) VALUES (?, ?, ?)",
            )
            .bind(submission_id)
            .bind(Decimal::new(0, 2))
            .bind(SubmissionStatus::EnAttente.to_string())
            .execute(&mut *tx)
            .await?;
        }
        SubmissionKind::Conge => {
            sqlx::query("INSERT INTO conges (submission_id, statut) VALUES (?, ?)")
                .bind(submission_id)
                .bind(SubmissionStatus::EnAttente.to_string())
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;

    info!(submission_id, employee_id = payload.employee_id, "Submission created");

    Ok(HttpResponse::Created().json(json!({
        "id": submission_id,
        "message": "Submission created",
        "statut": SubmissionStatus::EnAttente.to_string()
    })))
}

/// List submissions (paginated). Served entirely from the aggregate table:
/// the mirrored amounts make the sub-record join unnecessary.
#[utoipa::path(
    get,
    path = "/api/evp/submissions",
    params(SubmissionQuery),
    responses(
        (status = 200, description = "Paginated submission list", body = SubmissionListResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "EVP",
    security(("bearer_auth" = []))
)]
pub async fn list_submissions(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<SubmissionQuery>,
) -> Result<HttpResponse, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE 1=1");
    let mut employee_binding: Option<u64> = None;

    if let Some(employee_id) = query.employee_id {
        where_sql.push_str(" AND employee_id = ?");
        employee_binding = Some(employee_id);
    }

    match query.kind {
        Some(SubmissionKind::Prime) => where_sql.push_str(" AND is_prime = TRUE"),
        Some(SubmissionKind::Conge) => where_sql.push_str(" AND is_conge = TRUE"),
        None => {}
    }

    let count_sql = format!("SELECT COUNT(*) FROM evp_submissions{}", where_sql);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(employee_id) = employee_binding {
        count_query = count_query.bind(employee_id);
    }
    let total = count_query.fetch_one(pool.get_ref()).await?;

    let data_sql = format!(
        "SELECT * FROM evp_submissions{} ORDER BY updated_at DESC, id DESC LIMIT ? OFFSET ?",
        where_sql
    );
    let mut data_query = sqlx::query_as::<_, EvpSubmission>(&data_sql);
    if let Some(employee_id) = employee_binding {
        data_query = data_query.bind(employee_id);
    }
    let data = data_query
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(SubmissionListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Submission detail with its sub-record and full validation history.
#[utoipa::path(
    get,
    path = "/api/evp/submissions/{submission_id}",
    params(("submission_id", Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Submission detail", body = SubmissionDetail),
        (status = 404, description = "Submission not found")
    ),
    tag = "EVP",
    security(("bearer_auth" = []))
)]
pub async fn get_submission(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let submission_id = path.into_inner();
    let submission = fetch_submission(pool.get_ref(), submission_id).await?;

    let prime = if submission.is_prime {
        sqlx::query_as::<_, Prime>("SELECT * FROM primes WHERE submission_id = ?")
            .bind(submission_id)
            .fetch_optional(pool.get_ref())
            .await?
    } else {
        None
    };

    let conge = if submission.is_conge {
        sqlx::query_as::<_, Conge>("SELECT * FROM conges WHERE submission_id = ?")
            .bind(submission_id)
            .fetch_optional(pool.get_ref())
            .await?
    } else {
        None
    };

    let history = sqlx::query_as::<_, ValidationHistory>(
        "SELECT * FROM validation_history WHERE submission_id = ? ORDER BY created_at ASC, id ASC",
    )
    .bind(submission_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(SubmissionDetail {
        submission,
        prime,
        conge,
        history,
    }))
}

/// Update the attached sub-record and recompute the derived amount.
///
/// Recalculation runs exactly once per update, inside the same transaction
/// that mirrors the result onto the aggregate.
#[utoipa::path(
    put,
    path = "/api/evp/submissions/{submission_id}",
    params(("submission_id", Path, description = "Submission ID")),
    request_body = UpdateSubmission,
    responses(
        (status = 200, description = "Submission updated", body = Object, example = json!({
            "message": "Submission updated",
            "montant_calcule": "40.00"
        })),
        (status = 400, description = "Out-of-range field"),
        (status = 404, description = "Submission not found"),
        (status = 409, description = "Submission no longer editable")
    ),
    tag = "EVP",
    security(("bearer_auth" = []))
)]
pub async fn update_submission(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdateSubmission>,
) -> Result<HttpResponse, AppError> {
    let submission_id = path.into_inner();
    let submission = fetch_submission(pool.get_ref(), submission_id).await?;
    auth.require_owner_or_admin(submission.user_id)?;

    if submission.is_prime {
        if body.touches_conge() {
            return Err(AppError::Validation(
                "Submission carries a Prime sub-record; conge fields are not applicable".into(),
            ));
        }
        update_prime(&pool, &submission, &body).await
    } else if submission.is_conge {
        if body.touches_prime() {
            return Err(AppError::Validation(
                "Submission carries a Conge sub-record; prime fields are not applicable".into(),
            ));
        }
        update_conge(&pool, &submission, &body).await
    } else {
        // Inconsistent flags; sub_record_table reports the corruption.
        sub_record_table(&submission)?;
        unreachable!()
    }
}

fn require_editable(statut: SubmissionStatus) -> Result<(), AppError> {
    if matches!(statut, SubmissionStatus::EnAttente | SubmissionStatus::Soumis) {
        Ok(())
    } else {
        Err(AppError::InvalidState(format!(
            "Submission can no longer be edited while status is '{statut}'"
        )))
    }
}

// Upper bounds on free-form numeric inputs. Amounts are capped to what the
// DECIMAL(14, 2) columns hold; scores and counts get a generous ceiling so
// the calculator products stay far from Decimal overflow.
const SCORE_MAX: i32 = 10_000;
const COUNT_MAX: u32 = 10_000;

fn require_amount_range(name: &str, value: Option<Decimal>) -> Result<(), AppError> {
    if let Some(v) = value {
        if v < Decimal::ZERO {
            return Err(AppError::Validation(format!("{name} must not be negative")));
        }
        if v > calcul::montant_max() {
            return Err(AppError::Validation(format!(
                "{name} must not exceed {}",
                calcul::montant_max()
            )));
        }
    }
    Ok(())
}

fn require_score_range(name: &str, value: Option<i32>) -> Result<(), AppError> {
    if let Some(v) = value {
        if v < 0 {
            return Err(AppError::Validation(format!("{name} must not be negative")));
        }
        if v > SCORE_MAX {
            return Err(AppError::Validation(format!(
                "{name} must not exceed {SCORE_MAX}"
            )));
        }
    }
    Ok(())
}

fn require_count_range(name: &str, value: Option<u32>) -> Result<(), AppError> {
    if let Some(v) = value {
        if v > COUNT_MAX {
            return Err(AppError::Validation(format!(
                "{name} must not exceed {COUNT_MAX}"
            )));
        }
    }
    Ok(())
}

/// Everything one prime update writes: the merged sub-record fields plus
/// the amount mirrored onto the aggregate, computed exactly once so both
/// rows always receive the same value.
#[derive(Debug, PartialEq)]
struct PrimePlan {
    taux_monetaire: Option<Decimal>,
    groupe: Option<String>,
    nombre_postes: Option<u32>,
    score_equipe: Option<i32>,
    note_hierarchique: Option<i32>,
    score_collectif: Option<i32>,
    montant: Decimal,
}

fn plan_prime_update(prime: &Prime, body: &UpdateSubmission) -> Result<PrimePlan, AppError> {
    require_editable(SubmissionStatus::parse(&prime.statut)?)?;

    require_amount_range("taux_monetaire", body.taux_monetaire)?;
    require_count_range("nombre_postes", body.nombre_postes)?;
    require_score_range("score_equipe", body.score_equipe)?;
    require_score_range("note_hierarchique", body.note_hierarchique)?;
    require_score_range("score_collectif", body.score_collectif)?;

    let taux_monetaire = body.taux_monetaire.or(prime.taux_monetaire);
    let groupe = body.groupe.clone().or_else(|| prime.groupe.clone());
    let nombre_postes = body.nombre_postes.or(prime.nombre_postes);
    let score_equipe = body.score_equipe.or(prime.score_equipe);
    let note_hierarchique = body.note_hierarchique.or(prime.note_hierarchique);
    let score_collectif = body.score_collectif.or(prime.score_collectif);

    let montant = calcul::montant_prime(
        taux_monetaire,
        nombre_postes,
        score_equipe,
        note_hierarchique,
        score_collectif,
    );

    Ok(PrimePlan {
        taux_monetaire,
        groupe,
        nombre_postes,
        score_equipe,
        note_hierarchique,
        score_collectif,
        montant,
    })
}

/// Conge counterpart of [`PrimePlan`]. The indemnity stays `None` until the
/// calculator has all of its inputs.
#[derive(Debug, PartialEq)]
struct CongePlan {
    date_debut: Option<NaiveDate>,
    date_fin: Option<NaiveDate>,
    nombre_jours: Option<i64>,
    tranche: Option<u32>,
    indemnite_forfaitaire: Option<Decimal>,
    avance_conge: bool,
    montant_avance: Option<Decimal>,
    indemnite: Option<Decimal>,
}

fn plan_conge_update(conge: &Conge, body: &UpdateSubmission) -> Result<CongePlan, AppError> {
    require_editable(SubmissionStatus::parse(&conge.statut)?)?;

    require_amount_range("indemnite_forfaitaire", body.indemnite_forfaitaire)?;
    require_amount_range("montant_avance", body.montant_avance)?;
    require_count_range("tranche", body.tranche)?;

    let date_debut = body.date_debut.or(conge.date_debut);
    let date_fin = body.date_fin.or(conge.date_fin);
    let tranche = body.tranche.or(conge.tranche);
    let indemnite_forfaitaire = body.indemnite_forfaitaire.or(conge.indemnite_forfaitaire);
    let avance_conge = body.avance_conge.unwrap_or(conge.avance_conge);
    let montant_avance = body.montant_avance.or(conge.montant_avance);

    if let (Some(debut), Some(fin)) = (date_debut, date_fin) {
        if debut > fin {
            return Err(AppError::Validation(
                "date_debut cannot be after date_fin".into(),
            ));
        }
    }

    let nombre_jours = calcul::nombre_jours(date_debut, date_fin);
    let indemnite = calcul::indemnite_conge(nombre_jours, indemnite_forfaitaire, tranche);

    Ok(CongePlan {
        date_debut,
        date_fin,
        nombre_jours,
        tranche,
        indemnite_forfaitaire,
        avance_conge,
        montant_avance,
        indemnite,
    })
}

async fn update_prime(
    pool: &MySqlPool,
    submission: &EvpSubmission,
    body: &UpdateSubmission,
) -> Result<HttpResponse, AppError> {
    let prime = sqlx::query_as::<_, Prime>("SELECT * FROM primes WHERE submission_id = ?")
        .bind(submission.id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| {
            tracing::error!(submission_id = submission.id, "Prime row missing");
            AppError::Internal("Internal Server Error".into())
        })?;

    let plan = plan_prime_update(&prime, body)?;

    // Sub-record write and aggregate mirror are one atomic unit.
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE primes
        SET taux_monetaire = ?, groupe = ?, nombre_postes = ?,
            score_equipe = ?, note_hierarchique = ?, score_collectif = ?,
            montant_calcule = ?
        WHERE submission_id = ?
        "#,
    )
    .bind(plan.taux_monetaire)
    .bind(&plan.groupe)
    .bind(plan.nombre_postes)
    .bind(plan.score_equipe)
    .bind(plan.note_hierarchique)
    .bind(plan.score_collectif)
    .bind(plan.montant)
    .bind(submission.id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE evp_submissions SET montant_calcule = ?, updated_at = NOW() WHERE id = ?")
        .bind(plan.montant)
        .bind(submission.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Submission updated",
        "montant_calcule": plan.montant
    })))
}

async fn update_conge(
    pool: &MySqlPool,
    submission: &EvpSubmission,
    body: &UpdateSubmission,
) -> Result<HttpResponse, AppError> {
    let conge = sqlx::query_as::<_, Conge>("SELECT * FROM conges WHERE submission_id = ?")
        .bind(submission.id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| {
            tracing::error!(submission_id = submission.id, "Conge row missing");
            AppError::Internal("Internal Server Error".into())
        })?;

    let plan = plan_conge_update(&conge, body)?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE conges
        SET date_debut = ?, date_fin = ?, nombre_jours = ?, tranche = ?,
            indemnite_forfaitaire = ?, avance_conge = ?, montant_avance = ?,
            indemnite_calculee = ?
        WHERE submission_id = ?
        "#,
    )
    .bind(plan.date_debut)
    .bind(plan.date_fin)
    .bind(plan.nombre_jours.map(|j| j as i32))
    .bind(plan.tranche)
    .bind(plan.indemnite_forfaitaire)
    .bind(plan.avance_conge)
    .bind(plan.montant_avance)
    .bind(plan.indemnite)
    .bind(submission.id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE evp_submissions SET indemnite_calculee = ?, updated_at = NOW() WHERE id = ?",
    )
    .bind(plan.indemnite)
    .bind(submission.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Submission updated",
        "nombre_jours": plan.nombre_jours,
        "indemnite_calculee": plan.indemnite
    })))
}

/// Hand the submission over to the approval chain (`En attente` → `Soumis`).
#[utoipa::path(
    put,
    path = "/api/evp/submissions/{submission_id}/submit",
    params(("submission_id", Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Submission handed to the approval chain", body = Object, example = json!({
            "message": "Submission submitted",
            "statut": "Soumis"
        })),
        (status = 404, description = "Submission not found"),
        (status = 409, description = "Not in a submittable state")
    ),
    tag = "EVP",
    security(("bearer_auth" = []))
)]
pub async fn submit_submission(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let submission_id = path.into_inner();
    let submission = fetch_submission(pool.get_ref(), submission_id).await?;
    auth.require_owner_or_admin(submission.user_id)?;

    let statut = fetch_sub_record_status(pool.get_ref(), &submission).await?;
    let state = WorkflowState {
        statut,
        valide_service: submission.valide_service,
        valide_division: submission.valide_division,
    };
    let next = workflow::submit(&state)?;

    let table = sub_record_table(&submission)?;
    let mut tx = pool.begin().await?;

    // The status predicate doubles as an optimistic guard against a
    // concurrent writer.
    let sql = format!(
        "UPDATE {table} SET statut = ?, submitted_at = NOW() WHERE submission_id = ? AND statut = ?"
    );
    let updated = sqlx::query(&sql)
        .bind(next.to_string())
        .bind(submission_id)
        .bind(statut.to_string())
        .execute(&mut *tx)
        .await?;

    if updated.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(AppError::Conflict(
            "Submission was modified concurrently".into(),
        ));
    }

    sqlx::query("UPDATE evp_submissions SET updated_at = NOW() WHERE id = ?")
        .bind(submission_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(submission_id, "Submission submitted");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Submission submitted",
        "statut": next.to_string()
    })))
}

/// Apply one approval-chain transition (approve or reject at a level).
///
/// Status change, validation flags and the history entry are written in a
/// single transaction: a failed step leaves no visible effect.
#[utoipa::path(
    put,
    path = "/api/evp/submissions/{submission_id}/validate",
    params(("submission_id", Path, description = "Submission ID")),
    request_body = ValidateSubmission,
    responses(
        (status = 200, description = "Transition applied", body = Object, example = json!({
            "message": "Submission validated",
            "statut": "Validé (Service)"
        })),
        (status = 403, description = "Role does not match the level"),
        (status = 404, description = "Submission not found"),
        (status = 409, description = "Illegal transition")
    ),
    tag = "EVP",
    security(("bearer_auth" = []))
)]
pub async fn validate_submission(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<ValidateSubmission>,
) -> Result<HttpResponse, AppError> {
    let submission_id = path.into_inner();
    let submission = fetch_submission(pool.get_ref(), submission_id).await?;

    // Division validators with a division scope may only act on employees
    // of that division.
    if body.niveau == ValidationLevel::Division && auth.role == Role::ResponsableDivision {
        if let Some(scope) = &auth.division {
            let employee_division =
                sqlx::query_scalar::<_, String>("SELECT division FROM employees WHERE id = ?")
                    .bind(submission.employee_id)
                    .fetch_one(pool.get_ref())
                    .await?;
            if &employee_division != scope {
                return Err(AppError::Forbidden(format!(
                    "Submission belongs to the '{employee_division}' division"
                )));
            }
        }
    }

    let statut = fetch_sub_record_status(pool.get_ref(), &submission).await?;
    let state = WorkflowState {
        statut,
        valide_service: submission.valide_service,
        valide_division: submission.valide_division,
    };

    let transition = workflow::apply(&state, auth.role, body.niveau, body.action)?;

    let table = sub_record_table(&submission)?;
    let mut tx = pool.begin().await?;

    // Optimistic check: a second validator racing on the same level sees
    // zero affected rows and gets a conflict instead of a lost update.
    let sql = format!("UPDATE {table} SET statut = ? WHERE submission_id = ? AND statut = ?");
    let updated = sqlx::query(&sql)
        .bind(transition.statut.to_string())
        .bind(submission_id)
        .bind(statut.to_string())
        .execute(&mut *tx)
        .await?;

    if updated.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(AppError::Conflict(
            "Submission was validated concurrently".into(),
        ));
    }

    sqlx::query(
        r#"
        UPDATE evp_submissions
        SET valide_service = ?, valide_division = ?, updated_at = NOW()
        WHERE id = ?
        "#,
    )
    .bind(transition.valide_service)
    .bind(transition.valide_division)
    .bind(submission_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO validation_history (submission_id, user_id, action, niveau, commentaire)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(submission_id)
    .bind(auth.user_id)
    .bind(transition.action.to_string())
    .bind(transition.niveau.to_string())
    .bind(&body.commentaire)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        submission_id,
        action = %transition.action,
        niveau = %transition.niveau,
        statut = %transition.statut,
        "Validation transition applied"
    );

    Ok(HttpResponse::Ok().json(json!({
        "message": "Submission validated",
        "statut": transition.statut.to_string()
    })))
}

/// Delete a submission; the sub-record and history cascade with it.
#[utoipa::path(
    delete,
    path = "/api/evp/submissions/{submission_id}",
    params(("submission_id", Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Submission deleted", body = Object, example = json!({
            "message": "Submission deleted"
        })),
        (status = 404, description = "Submission not found")
    ),
    tag = "EVP",
    security(("bearer_auth" = []))
)]
pub async fn delete_submission(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let submission_id = path.into_inner();
    let submission = fetch_submission(pool.get_ref(), submission_id).await?;
    auth.require_owner_or_admin(submission.user_id)?;

    // ON DELETE CASCADE removes the sub-record and history with the root.
    let result = sqlx::query("DELETE FROM evp_submissions WHERE id = ?")
        .bind(submission_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Submission {submission_id} not found"
        )));
    }

    info!(submission_id, "Submission deleted");

    Ok(HttpResponse::Ok().json(json!({"message": "Submission deleted"})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn prime_row(statut: &str) -> Prime {
        Prime {
            id: 1,
            submission_id: 1,
            taux_monetaire: Some(dec("100")),
            groupe: Some("Groupe A".into()),
            nombre_postes: Some(2),
            score_equipe: Some(10),
            note_hierarchique: Some(5),
            score_collectif: Some(5),
            montant_calcule: dec("40.00"),
            statut: statut.into(),
            submitted_at: None,
        }
    }

    fn conge_row(statut: &str) -> Conge {
        Conge {
            id: 1,
            submission_id: 1,
            date_debut: None,
            date_fin: None,
            nombre_jours: None,
            tranche: None,
            indemnite_forfaitaire: None,
            avance_conge: false,
            montant_avance: None,
            indemnite_calculee: None,
            statut: statut.into(),
            submitted_at: None,
        }
    }

    #[test]
    fn prime_plan_mirror_matches_recomputation() {
        // The amount bound to the sub-record and to the aggregate both come
        // from plan.montant, so the mirror can only diverge if the plan's
        // value disagrees with a fresh calculation over the merged fields.
        let prime = prime_row("En attente");
        let body = UpdateSubmission {
            score_equipe: Some(20),
            ..Default::default()
        };

        let plan = plan_prime_update(&prime, &body).unwrap();
        assert_eq!(plan.score_equipe, Some(20));
        assert_eq!(plan.note_hierarchique, Some(5));
        assert_eq!(
            plan.montant,
            calcul::montant_prime(
                plan.taux_monetaire,
                plan.nombre_postes,
                plan.score_equipe,
                plan.note_hierarchique,
                plan.score_collectif,
            )
        );
        // ceil(100 * 2 * (20 + 5 + 5) / 100) = 60
        assert_eq!(plan.montant, dec("60.00"));
    }

    #[test]
    fn prime_plan_keeps_unmentioned_fields() {
        let prime = prime_row("Soumis");
        let plan = plan_prime_update(&prime, &UpdateSubmission::default()).unwrap();
        assert_eq!(plan.taux_monetaire, Some(dec("100")));
        assert_eq!(plan.groupe.as_deref(), Some("Groupe A"));
        assert_eq!(plan.montant, dec("40.00"));
    }

    #[test]
    fn prime_plan_rejects_out_of_range_inputs() {
        let prime = prime_row("En attente");

        let body = UpdateSubmission {
            score_equipe: Some(i32::MAX),
            ..Default::default()
        };
        assert!(matches!(
            plan_prime_update(&prime, &body),
            Err(AppError::Validation(_))
        ));

        let body = UpdateSubmission {
            taux_monetaire: Some(dec("1000000000000.00")),
            ..Default::default()
        };
        assert!(matches!(
            plan_prime_update(&prime, &body),
            Err(AppError::Validation(_))
        ));

        let body = UpdateSubmission {
            taux_monetaire: Some(dec("-1")),
            ..Default::default()
        };
        assert!(matches!(
            plan_prime_update(&prime, &body),
            Err(AppError::Validation(_))
        ));

        let body = UpdateSubmission {
            nombre_postes: Some(COUNT_MAX + 1),
            ..Default::default()
        };
        assert!(matches!(
            plan_prime_update(&prime, &body),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn plans_refuse_non_editable_statuses() {
        for statut in ["Validé (Service)", "Validé (Division)", "Approuvé (RH)", "Rejeté"] {
            assert!(matches!(
                plan_prime_update(&prime_row(statut), &UpdateSubmission::default()),
                Err(AppError::InvalidState(_))
            ));
            assert!(matches!(
                plan_conge_update(&conge_row(statut), &UpdateSubmission::default()),
                Err(AppError::InvalidState(_))
            ));
        }
    }

    #[test]
    fn conge_plan_computes_days_and_indemnity_together() {
        let conge = conge_row("En attente");
        let body = UpdateSubmission {
            date_debut: NaiveDate::from_ymd_opt(2026, 1, 30),
            date_fin: NaiveDate::from_ymd_opt(2026, 2, 1),
            tranche: Some(2),
            indemnite_forfaitaire: Some(dec("50")),
            ..Default::default()
        };

        let plan = plan_conge_update(&conge, &body).unwrap();
        assert_eq!(plan.nombre_jours, Some(3));
        // ceil(3 * 50 * 2 / 10) = 30
        assert_eq!(plan.indemnite, Some(dec("30.00")));
        assert_eq!(
            plan.indemnite,
            calcul::indemnite_conge(plan.nombre_jours, plan.indemnite_forfaitaire, plan.tranche)
        );
    }

    #[test]
    fn conge_plan_leaves_indemnity_unset_while_inputs_missing() {
        let conge = conge_row("En attente");
        let body = UpdateSubmission {
            date_debut: NaiveDate::from_ymd_opt(2026, 1, 30),
            date_fin: NaiveDate::from_ymd_opt(2026, 2, 1),
            ..Default::default()
        };

        let plan = plan_conge_update(&conge, &body).unwrap();
        assert_eq!(plan.nombre_jours, Some(3));
        assert_eq!(plan.indemnite, None);
    }

    #[test]
    fn conge_plan_rejects_reversed_dates() {
        let conge = conge_row("En attente");
        let body = UpdateSubmission {
            date_debut: NaiveDate::from_ymd_opt(2026, 2, 1),
            date_fin: NaiveDate::from_ymd_opt(2026, 1, 30),
            ..Default::default()
        };
        assert!(matches!(
            plan_conge_update(&conge, &body),
            Err(AppError::Validation(_))
        ));
    }
}
