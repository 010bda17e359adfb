use time::{Date, OffsetDateTime};

use dowser_domain::quota::{daily_window_expired, local_today, monthly_window_expired};
use dowser_storage::{
	models::QuotaRow,
	quota::{cas_update_quota, fetch_quota, insert_quota},
};

use crate::{DowserService, ServiceError, ServiceResult};

const CAS_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaKind {
	/// One request against the daily counter.
	Daily,
	/// One request plus the per-answer spend against the monthly cap.
	Answer,
}

impl DowserService {
	/// Checks the tenant's quota windows and consumes in one optimistic
	/// compare-and-swap. Concurrent consumers race on the row version; the
	/// loser rereads and retries. Storage trouble denies the request rather
	/// than letting traffic through unmetered.
	pub(crate) async fn check_and_consume(
		&self,
		tenant_id: &str,
		kind: QuotaKind,
	) -> ServiceResult<()> {
		let now = OffsetDateTime::now_utc();
		let today = local_today(now, self.cfg.quota.utc_offset_minutes);

		for _ in 0..CAS_ATTEMPTS {
			let row = match fetch_quota(&self.db, tenant_id).await {
				Ok(row) => row,
				Err(err) => {
					tracing::error!(%tenant_id, %err, "Quota fetch failed; denying request.");

					return Err(ServiceError::RateLimited {
						message: "Quota state is unavailable.".to_string(),
					});
				},
			};
			let Some(mut row) = row else {
				match insert_quota(&self.db, &seed_row(tenant_id, today, &self.cfg.quota)).await {
					// Reread whether we seeded or lost the seeding race.
					Ok(_) => continue,
					Err(err) => {
						tracing::error!(%tenant_id, %err, "Quota seed failed; denying request.");

						return Err(ServiceError::RateLimited {
							message: "Quota state is unavailable.".to_string(),
						});
					},
				}
			};

			if daily_window_expired(row.daily_reset_on, today) {
				row.daily_used = 0;
				row.daily_reset_on = today;
			}
			if monthly_window_expired(row.monthly_reset_on, today) {
				row.monthly_spent_cents = 0;
				row.monthly_reset_on = today;
			}

			if row.daily_used >= self.cfg.quota.daily_request_limit {
				return Err(ServiceError::RateLimited {
					message: "Daily request limit reached.".to_string(),
				});
			}

			row.daily_used += 1;

			if kind == QuotaKind::Answer {
				if let Some(cap) = row.monthly_cap_cents
					&& row.monthly_spent_cents + self.cfg.quota.answer_cost_cents > cap
				{
					return Err(ServiceError::RateLimited {
						message: "Monthly spend cap reached.".to_string(),
					});
				}

				row.monthly_spent_cents += self.cfg.quota.answer_cost_cents;
			}

			match cas_update_quota(&self.db, &row, row.version).await {
				Ok(true) => return Ok(()),
				Ok(false) => continue,
				Err(err) => {
					tracing::error!(%tenant_id, %err, "Quota update failed; denying request.");

					return Err(ServiceError::RateLimited {
						message: "Quota state is unavailable.".to_string(),
					});
				},
			}
		}

		Err(ServiceError::RateLimited {
			message: "Quota state is contended; try again.".to_string(),
		})
	}
}

fn seed_row(tenant_id: &str, today: Date, cfg: &dowser_config::Quota) -> QuotaRow {
	QuotaRow {
		tenant_id: tenant_id.to_string(),
		daily_used: 0,
		daily_reset_on: today,
		monthly_spent_cents: 0,
		monthly_cap_cents: (cfg.default_monthly_cap_cents > 0)
			.then_some(cfg.default_monthly_cap_cents),
		monthly_reset_on: today,
		version: 0,
	}
}
