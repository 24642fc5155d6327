use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;

const FILTER_CAPACITY: usize = 10_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

/// Login emails already registered. A miss means the email is free; a hit
/// still needs a database check.
static EMAIL_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

#[inline]
fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn might_exist(email: &str) -> bool {
    let email = normalize(email);
    EMAIL_FILTER
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .contains(&email)
}

pub fn insert(email: &str) {
    let email = normalize(email);
    EMAIL_FILTER
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .add(&email);
}

fn insert_batch(emails: &[String]) {
    let mut filter = EMAIL_FILTER
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    for email in emails {
        filter.add(email);
    }
}

/// Streams every registered email into the filter in batches.
pub async fn warmup_email_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT email FROM users").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (email,) = row.map_err(|e| anyhow!("email row fetch failed: {e}"))?;
        batch.push(normalize(&email));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    tracing::info!(total, "Email filter warmup complete");
    Ok(())
}

/// `true` when `email` is already used by a login account.
pub async fn is_email_taken(pool: &MySqlPool, email: &str) -> Result<bool, sqlx::Error> {
    if !might_exist(email) {
        return Ok(false);
    }

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(normalize(email))
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}
