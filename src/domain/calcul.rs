use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Zero bonus amount, kept at two decimal places so it serializes as "0.00".
fn zero_amount() -> Decimal {
    Decimal::new(0, 2)
}

/// Largest amount a DECIMAL(14, 2) column can hold.
pub fn montant_max() -> Decimal {
    Decimal::new(99_999_999_999_999, 2)
}

fn clamp_amount(amount: Decimal) -> Decimal {
    let mut amount = amount.min(montant_max());
    amount.rescale(2);
    amount
}

/// Derived bonus amount:
/// `ceil(taux_monetaire * nombre_postes * (score_equipe + note_hierarchique + score_collectif) / 100)`.
///
/// Missing `taux_monetaire` or `nombre_postes` degrades to `0.00`; missing
/// individual scores count as 0 in the sum. Never panics: the score sum is
/// widened to i64 and the product saturates to the column maximum instead of
/// overflowing.
pub fn montant_prime(
    taux_monetaire: Option<Decimal>,
    nombre_postes: Option<u32>,
    score_equipe: Option<i32>,
    note_hierarchique: Option<i32>,
    score_collectif: Option<i32>,
) -> Decimal {
    let (taux, postes) = match (taux_monetaire, nombre_postes) {
        (Some(t), Some(p)) => (t, p),
        _ => return zero_amount(),
    };

    let scores = i64::from(score_equipe.unwrap_or(0))
        + i64::from(note_hierarchique.unwrap_or(0))
        + i64::from(score_collectif.unwrap_or(0));

    let montant = taux
        .checked_mul(Decimal::from(postes))
        .and_then(|m| m.checked_mul(Decimal::from(scores)))
        .map(|m| (m / Decimal::from(100)).ceil());

    clamp_amount(montant.unwrap_or_else(montant_max))
}

/// Inclusive calendar-day count between the two dates (`fin - debut + 1`).
/// `None` while either date is unset. Negative ranges are rejected upstream
/// as validation errors before this is called.
pub fn nombre_jours(date_debut: Option<NaiveDate>, date_fin: Option<NaiveDate>) -> Option<i64> {
    match (date_debut, date_fin) {
        (Some(debut), Some(fin)) => Some(fin.signed_duration_since(debut).num_days() + 1),
        _ => None,
    }
}

/// Derived leave indemnity:
/// `ceil(nombre_jours * indemnite_forfaitaire * tranche / 10)`.
///
/// Computed only when all three inputs are present; otherwise the indemnity
/// stays unset (`None`, not zero; the bonus calculator defaults to zero
/// instead). Saturates to the column maximum like `montant_prime`.
pub fn indemnite_conge(
    nombre_jours: Option<i64>,
    indemnite_forfaitaire: Option<Decimal>,
    tranche: Option<u32>,
) -> Option<Decimal> {
    let (jours, forfait, tranche) = match (nombre_jours, indemnite_forfaitaire, tranche) {
        (Some(j), Some(f), Some(t)) => (j, f, t),
        _ => return None,
    };

    let indemnite = Decimal::from(jours)
        .checked_mul(forfait)
        .and_then(|m| m.checked_mul(Decimal::from(tranche)))
        .map(|m| (m / Decimal::from(10)).ceil());

    Some(clamp_amount(indemnite.unwrap_or_else(montant_max)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn montant_prime_formula() {
        // ceil(100 * 2 * (10 + 5 + 5) / 100) = 40
        let montant = montant_prime(Some(dec("100")), Some(2), Some(10), Some(5), Some(5));
        assert_eq!(montant, dec("40.00"));
        assert_eq!(montant.to_string(), "40.00");
    }

    #[test]
    fn montant_prime_rounds_up() {
        // 33.5 * 1 * 10 / 100 = 3.35 -> 4
        let montant = montant_prime(Some(dec("33.5")), Some(1), Some(10), None, None);
        assert_eq!(montant, dec("4.00"));
    }

    #[test]
    fn montant_prime_is_idempotent() {
        let first = montant_prime(Some(dec("100")), Some(2), Some(10), Some(5), Some(5));
        let second = montant_prime(Some(dec("100")), Some(2), Some(10), Some(5), Some(5));
        assert_eq!(first, second);
    }

    #[test]
    fn missing_taux_or_postes_gives_zero() {
        let missing_taux = montant_prime(None, Some(2), Some(10), Some(5), Some(5));
        assert_eq!(missing_taux.to_string(), "0.00");

        let missing_postes = montant_prime(Some(dec("100")), None, Some(10), Some(5), Some(5));
        assert_eq!(missing_postes.to_string(), "0.00");
    }

    #[test]
    fn missing_scores_count_as_zero() {
        // ceil(100 * 2 * 10 / 100) = 20
        let montant = montant_prime(Some(dec("100")), Some(2), Some(10), None, None);
        assert_eq!(montant, dec("20.00"));
    }

    #[test]
    fn nombre_jours_is_inclusive_across_month_boundary() {
        let debut = NaiveDate::from_ymd_opt(2024, 1, 30).unwrap();
        let fin = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(nombre_jours(Some(debut), Some(fin)), Some(3));
    }

    #[test]
    fn nombre_jours_across_year_boundary() {
        let debut = NaiveDate::from_ymd_opt(2025, 12, 30).unwrap();
        let fin = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        assert_eq!(nombre_jours(Some(debut), Some(fin)), Some(4));
    }

    #[test]
    fn nombre_jours_single_day() {
        let jour = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        assert_eq!(nombre_jours(Some(jour), Some(jour)), Some(1));
    }

    #[test]
    fn nombre_jours_needs_both_dates() {
        let jour = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        assert_eq!(nombre_jours(Some(jour), None), None);
        assert_eq!(nombre_jours(None, Some(jour)), None);
    }

    #[test]
    fn indemnite_conge_formula() {
        // ceil(10 * 50 * 2 / 10) = 100
        let indemnite = indemnite_conge(Some(10), Some(dec("50")), Some(2));
        assert_eq!(indemnite, Some(dec("100.00")));
    }

    #[test]
    fn indemnite_conge_rounds_up() {
        // 3 * 33.4 * 1 / 10 = 10.02 -> 11
        let indemnite = indemnite_conge(Some(3), Some(dec("33.4")), Some(1));
        assert_eq!(indemnite, Some(dec("11.00")));
    }

    #[test]
    fn extreme_scores_never_panic() {
        // The score sum is widened to i64, so three i32::MAX scores stay
        // representable and the result clamps to the column maximum.
        let montant = montant_prime(
            Some(dec("1")),
            Some(1),
            Some(i32::MAX),
            Some(i32::MAX),
            Some(i32::MAX),
        );
        assert!(montant <= montant_max());

        let single = montant_prime(Some(dec("1")), Some(1), Some(i32::MAX), Some(1), None);
        assert!(single > Decimal::ZERO);
    }

    #[test]
    fn overflowing_product_saturates_to_column_max() {
        let montant = montant_prime(
            Some(Decimal::MAX),
            Some(u32::MAX),
            Some(i32::MAX),
            Some(i32::MAX),
            Some(i32::MAX),
        );
        assert_eq!(montant, montant_max());
        assert_eq!(montant.to_string(), "999999999999.99");

        let indemnite = indemnite_conge(Some(i64::MAX), Some(Decimal::MAX), Some(u32::MAX));
        assert_eq!(indemnite, Some(montant_max()));
    }

    #[test]
    fn missing_input_leaves_indemnite_unset_not_zero() {
        // The divergence from the bonus calculator: null, never 0.00.
        assert_eq!(indemnite_conge(Some(10), None, Some(2)), None);
        assert_eq!(indemnite_conge(None, Some(dec("50")), Some(2)), None);
        assert_eq!(indemnite_conge(Some(10), Some(dec("50")), None), None);
    }
}
