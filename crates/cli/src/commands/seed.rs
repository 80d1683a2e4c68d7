//! Seed reference data.

use tracing::info;

/// Format the `n`th unit number, zero-padded to three digits.
fn unit_number(prefix: &str, n: u32) -> String {
    format!("{prefix}{n:03}")
}

/// Add units `{prefix}001..={prefix}{count}`, skipping numbers that exist.
///
/// # Errors
///
/// Returns an error if the connection or an insert fails.
pub async fn storage_units(count: u32, prefix: &str) -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    let mut inserted = 0_u64;
    for n in 1..=count {
        let result = sqlx::query(
            "INSERT INTO storage_units (unit_number) VALUES ($1) ON CONFLICT (unit_number) DO NOTHING",
        )
        .bind(unit_number(prefix, n))
        .execute(&pool)
        .await?;
        inserted += result.rows_affected();
    }

    info!("Seeding complete!");
    info!("  Units inserted: {inserted}");
    info!("  Units skipped (already exist): {}", u64::from(count) - inserted);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_numbers_are_zero_padded() {
        assert_eq!(unit_number("SU-", 7), "SU-007");
        assert_eq!(unit_number("B", 120), "B120");
    }
}
