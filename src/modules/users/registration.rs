//! User creation with in-transaction identifier allocation.
//!
//! The user row, its role profile and (for teachers and students) the
//! identifier are written in one transaction. With the counter strategy
//! the counter increment joins that transaction, so a failed registration
//! consumes nothing. With the scan strategy two concurrent registrations
//! may derive the same identifier; the unique constraint rejects the
//! second and the whole transaction is replayed.

use anyhow::anyhow;
use rostra_config::{IdAllocationConfig, IdStrategy};
use rostra_core::{AppError, hash_password};
use rostra_db::{PgPool, is_unique_violation_on};
use rostra_ids::{
    AllocationError, EntityClass, IdAllocator, Identifier, PgCounterStore, PgScanLedger,
    SequenceStore, Year, identifier_constraint,
};
use rostra_models::{
    AdminProfile, CreateUserDto, DEFAULT_COURSE, DEFAULT_DEPARTMENT, DEFAULT_SPECIALIZATION,
    DEFAULT_YEAR_LEVEL, Profile, StudentProfile, TeacherProfile, UpdateUserDto, User, UserRole,
    UserWithProfile,
};
use sqlx::PgConnection;
use std::future::Future;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::metrics::{track_allocation_conflict, track_identifier_allocated, track_user_registered};

const USERS_EMAIL_CONSTRAINT: &str = "users_email_key";

/// Issues employee and student IDs on a caller-supplied connection using
/// the configured ledger design.
#[derive(Clone, Debug)]
pub struct IdentifierIssuer {
    allocator: IdAllocator,
    config: IdAllocationConfig,
}

impl IdentifierIssuer {
    pub fn from_env() -> Self {
        Self::from_config(IdAllocationConfig::from_env())
    }

    pub fn from_config(config: IdAllocationConfig) -> Self {
        Self {
            allocator: IdAllocator::new(config.max_attempts, config.backoff),
            config,
        }
    }

    pub fn strategy(&self) -> IdStrategy {
        self.config.strategy
    }

    pub fn max_attempts(&self) -> u32 {
        self.allocator.max_attempts()
    }

    /// Allocates the next identifier for `class` in the current year.
    ///
    /// `conn` should be the transaction that will insert the profile row.
    #[instrument(skip(self, conn), fields(strategy = %self.config.strategy))]
    pub async fn issue(
        &self,
        conn: &mut PgConnection,
        class: EntityClass,
    ) -> Result<Identifier, AllocationError> {
        let year = Year::current()?;

        let mut store: Box<dyn SequenceStore + '_> = match self.config.strategy {
            IdStrategy::Counter => Box::new(PgCounterStore::new(conn, self.config.lock_timeout)),
            IdStrategy::Scan => Box::new(PgScanLedger::new(conn)),
        };

        let identifier = self.allocator.allocate(store.as_mut(), class, year).await?;
        track_identifier_allocated(class, self.config.strategy.as_str());
        Ok(identifier)
    }
}

/// Failure of a write that creates or changes a user's role profile.
#[derive(Debug, thiserror::Error)]
pub enum UserWriteError {
    #[error("This email is already registered")]
    EmailTaken,

    #[error("User with id {0} not found")]
    UserNotFound(Uuid),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl UserWriteError {
    pub fn into_app_error(self) -> AppError {
        match self {
            UserWriteError::EmailTaken => AppError::bad_request(UserWriteError::EmailTaken),
            err @ UserWriteError::UserNotFound(_) => AppError::not_found(err),
            UserWriteError::Allocation(err) => allocation_error_response(err),
            UserWriteError::Database(err) => {
                AppError::database(anyhow::Error::new(err).context("Failed to write user"))
            }
        }
    }
}

/// HTTP status for an allocation failure that reached a handler.
pub fn allocation_error_response(err: AllocationError) -> AppError {
    match err {
        AllocationError::InvalidEntityClass(_) | AllocationError::InvalidYear(_) => {
            AppError::unprocessable(err)
        }
        AllocationError::AllocationConflict { .. } => AppError::unavailable(err),
        AllocationError::DuplicateIdentifier(_) => AppError::conflict(err),
        AllocationError::CorruptLedgerEntry { .. }
        | AllocationError::SequenceExhausted { .. }
        | AllocationError::Store(_) => AppError::internal(err),
    }
}

/// Optional profile attributes, with institution defaults applied on insert.
#[derive(Debug, Clone, Default)]
pub struct ProfileFields {
    pub department: Option<String>,
    pub specialization: Option<String>,
    pub course: Option<String>,
    pub year_level: Option<String>,
    pub section: Option<String>,
}

impl From<&CreateUserDto> for ProfileFields {
    fn from(dto: &CreateUserDto) -> Self {
        Self {
            department: dto.department.clone(),
            specialization: dto.specialization.clone(),
            course: dto.course.clone(),
            year_level: dto.year_level.clone(),
            section: dto.section.clone(),
        }
    }
}

impl From<&UpdateUserDto> for ProfileFields {
    fn from(dto: &UpdateUserDto) -> Self {
        Self {
            department: dto.department.clone(),
            specialization: dto.specialization.clone(),
            course: dto.course.clone(),
            year_level: dto.year_level.clone(),
            section: dto.section.clone(),
        }
    }
}

/// Replays `write` while it fails on an identifier another transaction
/// recorded first, up to the issuer's attempt limit.
pub(crate) async fn retry_on_duplicate_identifier<T, F, Fut>(
    issuer: &IdentifierIssuer,
    class: Option<EntityClass>,
    mut write: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UserWriteError>>,
{
    let mut attempt = 1;
    loop {
        match write().await {
            Ok(value) => return Ok(value),
            Err(UserWriteError::Allocation(err)) => {
                let duplicate = matches!(err, AllocationError::DuplicateIdentifier(_));
                if let Some(class) = class.filter(|_| duplicate || err.is_retryable()) {
                    track_allocation_conflict(class, &err);
                }

                if !duplicate {
                    return Err(allocation_error_response(err));
                }

                if attempt >= issuer.max_attempts() {
                    warn!(attempts = attempt, error = %err, "Identifier still taken, giving up");
                    return Err(AppError::conflict(anyhow!(
                        "Could not allocate a unique identifier after {} attempts",
                        attempt
                    )));
                }

                warn!(attempt, error = %err, "Identifier taken by a concurrent registration, retrying");
                attempt += 1;
            }
            Err(err) => return Err(err.into_app_error()),
        }
    }
}

/// Inserts the profile row for `role`, allocating an identifier first for
/// teachers and students.
pub(crate) async fn insert_profile(
    conn: &mut PgConnection,
    issuer: &IdentifierIssuer,
    user_id: Uuid,
    role: UserRole,
    fields: &ProfileFields,
) -> Result<Profile, UserWriteError> {
    let Some(class) = role.entity_class() else {
        let admin = sqlx::query_as::<_, AdminProfile>(
            "INSERT INTO admins (user_id) VALUES ($1) RETURNING *",
        )
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
        return Ok(Profile::Admin(admin));
    };

    let identifier = issuer.issue(&mut *conn, class).await?;
    let duplicate = |e: sqlx::Error| {
        if is_unique_violation_on(&e, identifier_constraint(class)) {
            UserWriteError::Allocation(AllocationError::DuplicateIdentifier(identifier.to_string()))
        } else {
            UserWriteError::Database(e)
        }
    };

    let profile = match class {
        EntityClass::Teacher => Profile::Teacher(
            sqlx::query_as::<_, TeacherProfile>(
                r#"
                INSERT INTO teachers (user_id, employee_id, department, specialization)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            )
            .bind(user_id)
            .bind(identifier.to_string())
            .bind(fields.department.as_deref().unwrap_or(DEFAULT_DEPARTMENT))
            .bind(fields.specialization.as_deref().unwrap_or(DEFAULT_SPECIALIZATION))
            .fetch_one(&mut *conn)
            .await
            .map_err(duplicate)?,
        ),
        EntityClass::Student => Profile::Student(
            sqlx::query_as::<_, StudentProfile>(
                r#"
                INSERT INTO students (user_id, student_id, course, year_level, section)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
                "#,
            )
            .bind(user_id)
            .bind(identifier.to_string())
            .bind(fields.course.as_deref().unwrap_or(DEFAULT_COURSE))
            .bind(fields.year_level.as_deref().unwrap_or(DEFAULT_YEAR_LEVEL))
            .bind(fields.section.as_deref())
            .fetch_one(&mut *conn)
            .await
            .map_err(duplicate)?,
        ),
    };

    Ok(profile)
}

pub(crate) fn email_taken_or(err: sqlx::Error) -> UserWriteError {
    if is_unique_violation_on(&err, USERS_EMAIL_CONSTRAINT) {
        UserWriteError::EmailTaken
    } else {
        UserWriteError::Database(err)
    }
}

pub struct RegistrationService;

impl RegistrationService {
    /// Creates a user and its role profile, issuing an employee or student
    /// ID for teachers and students.
    #[instrument(skip(db, issuer, dto), fields(email = %dto.email, role = %dto.role))]
    pub async fn register(
        db: &PgPool,
        issuer: &IdentifierIssuer,
        dto: CreateUserDto,
    ) -> Result<UserWithProfile, AppError> {
        let password_hash = hash_password(&dto.password)?;
        let fields = ProfileFields::from(&dto);

        let (dto, password_hash, fields) = (&dto, password_hash.as_str(), &fields);
        let created = retry_on_duplicate_identifier(issuer, dto.role.entity_class(), move || {
            Self::try_register(db, issuer, dto, password_hash, fields)
        })
        .await?;

        track_user_registered(created.user.role.as_str());
        info!(
            user_id = %created.user.id,
            identifier = created.profile.as_ref().and_then(Profile::identifier).unwrap_or("-"),
            "User registered"
        );

        Ok(created)
    }

    async fn try_register(
        db: &PgPool,
        issuer: &IdentifierIssuer,
        dto: &CreateUserDto,
        password_hash: &str,
        fields: &ProfileFields,
    ) -> Result<UserWithProfile, UserWriteError> {
        let mut tx = db.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password, role)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&dto.name)
        .bind(&dto.email)
        .bind(password_hash)
        .bind(dto.role.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(email_taken_or)?;

        let profile = insert_profile(&mut *tx, issuer, user.id, user.role, fields).await?;

        tx.commit().await?;

        Ok(UserWithProfile {
            user,
            profile: Some(profile),
        })
    }
}
