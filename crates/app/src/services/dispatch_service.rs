//! Dispatch service — resolve a caller's VM identifier and run one lifecycle command.

use hostd_domain::command::LifecycleCommand;
use hostd_domain::error::{HostdError, ResolutionError};
use hostd_domain::id::IdentifierQuery;
use hostd_domain::record::DomainRecord;

use crate::ports::ManagementSession;

/// Listing cap used when none is configured.
pub const DEFAULT_LISTING_LIMIT: usize = 1024;

/// Stateless use-case translating identifiers into lifecycle calls.
pub struct DispatchService<S> {
    session: S,
    listing_limit: usize,
}

impl<S: ManagementSession> DispatchService<S> {
    /// Create a new service with the default listing limit.
    pub fn new(session: S) -> Self {
        Self::with_listing_limit(session, DEFAULT_LISTING_LIMIT)
    }

    /// Create a new service that refuses listings larger than `listing_limit`.
    pub fn with_listing_limit(session: S, listing_limit: usize) -> Self {
        Self {
            session,
            listing_limit,
        }
    }

    /// Borrow the underlying session.
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Resolve `raw` against the live set of active domains.
    ///
    /// The first record whose identifier matches wins.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::NotFound`] when nothing matches,
    /// [`ResolutionError::ListingOverflow`] when the listing exceeds the
    /// configured limit, or [`ResolutionError::Listing`] when the session
    /// could not produce a listing.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, raw: &str) -> Result<DomainRecord, HostdError> {
        let query = IdentifierQuery::new(raw);
        let domains = self
            .session
            .list_active_domains()
            .await
            .map_err(|err| ResolutionError::Listing(Box::new(err)))?;
        tracing::debug!(query = query.as_str(), count = domains.len(), "listed active domains");

        if domains.len() > self.listing_limit {
            return Err(ResolutionError::ListingOverflow {
                count: domains.len(),
                limit: self.listing_limit,
            }
            .into());
        }

        domains
            .into_iter()
            .find(|record| query.matches(record.uuid))
            .ok_or_else(|| ResolutionError::NotFound.into())
    }

    /// Resolve `raw` then issue `command` against the result.
    ///
    /// No command is issued when resolution fails.
    ///
    /// # Errors
    ///
    /// Returns [`HostdError::Resolution`] if the target could not be
    /// resolved, or [`HostdError::Session`] if the lifecycle call failed.
    #[tracing::instrument(skip(self))]
    pub async fn dispatch(&self, command: LifecycleCommand, raw: &str) -> Result<(), HostdError> {
        let record = self.resolve(raw).await?;
        tracing::debug!(domain = %record.handle.name, uuid = %record.uuid, "resolved target");
        self.session.execute(command, &record.handle).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostd_domain::id::DomainUuid;
    use hostd_domain::record::DomainHandle;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Refused(&'static str);

    impl std::fmt::Display for Refused {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.0)
        }
    }

    impl std::error::Error for Refused {}

    #[derive(Default)]
    struct InMemorySession {
        domains: Vec<DomainRecord>,
        fail_listing: bool,
        fail_commands: bool,
        calls: Mutex<Vec<(LifecycleCommand, DomainHandle)>>,
    }

    impl InMemorySession {
        fn with_domains(domains: Vec<DomainRecord>) -> Self {
            Self {
                domains,
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<(LifecycleCommand, DomainHandle)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ManagementSession for InMemorySession {
        async fn list_active_domains(&self) -> Result<Vec<DomainRecord>, HostdError> {
            if self.fail_listing {
                return Err(HostdError::Session(Box::new(Refused("connection reset"))));
            }
            Ok(self.domains.clone())
        }

        async fn execute(
            &self,
            command: LifecycleCommand,
            domain: &DomainHandle,
        ) -> Result<(), HostdError> {
            self.calls.lock().unwrap().push((command, domain.clone()));
            if self.fail_commands {
                return Err(HostdError::Session(Box::new(Refused(
                    "Requested operation is not valid: domain is not running",
                ))));
            }
            Ok(())
        }
    }

    const SAMPLE: &str = "aabbccdd-0011-2233-4455-66778899aabb";

    fn sample_record() -> DomainRecord {
        DomainRecord::new("vm-sample", SAMPLE.parse().unwrap(), 3)
    }

    fn random_record(name: &str) -> DomainRecord {
        DomainRecord::new(name, DomainUuid::from_uuid(uuid::Uuid::new_v4()), 1)
    }

    #[tokio::test]
    async fn should_resolve_hyphen_stripped_identifier() {
        let service = DispatchService::new(InMemorySession::with_domains(vec![
            random_record("other"),
            sample_record(),
        ]));

        let record = service
            .resolve("aabbccdd00112233445566778899aabb")
            .await
            .unwrap();
        assert_eq!(record, sample_record());
    }

    #[tokio::test]
    async fn should_resolve_hyphenated_identifier() {
        let service = DispatchService::new(InMemorySession::with_domains(vec![sample_record()]));
        let record = service.resolve(SAMPLE).await.unwrap();
        assert_eq!(record.handle.name, "vm-sample");
    }

    #[tokio::test]
    async fn should_resolve_identifier_case_insensitively() {
        let service = DispatchService::new(InMemorySession::with_domains(vec![sample_record()]));
        let record = service
            .resolve("AABBCCDD00112233445566778899AABB")
            .await
            .unwrap();
        assert_eq!(record.uuid, sample_record().uuid);
    }

    #[tokio::test]
    async fn should_pick_first_match_when_listing_repeats_identifier() {
        let uuid: DomainUuid = SAMPLE.parse().unwrap();
        let service = DispatchService::new(InMemorySession::with_domains(vec![
            DomainRecord::new("first", uuid, 1),
            DomainRecord::new("second", uuid, 2),
        ]));
        let record = service.resolve(SAMPLE).await.unwrap();
        assert_eq!(record.handle.name, "first");
    }

    #[tokio::test]
    async fn should_return_not_found_when_listing_is_empty() {
        let service = DispatchService::new(InMemorySession::default());
        let err = service.resolve(SAMPLE).await.unwrap_err();
        assert!(matches!(
            err,
            HostdError::Resolution(ResolutionError::NotFound)
        ));
        assert_eq!(err.to_string(), "(query) unable to find VM");
    }

    #[tokio::test]
    async fn should_issue_exactly_one_call_for_resolved_target() {
        for command in LifecycleCommand::ALL {
            let service =
                DispatchService::new(InMemorySession::with_domains(vec![sample_record()]));
            service
                .dispatch(command, "aabbccdd00112233445566778899aabb")
                .await
                .unwrap();

            let calls = service.session().calls();
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].0, command);
            assert_eq!(calls[0].1, sample_record().handle);
        }
    }

    #[tokio::test]
    async fn should_not_issue_command_when_target_is_absent() {
        let service = DispatchService::new(InMemorySession::with_domains(vec![random_record(
            "other",
        )]));
        let err = service
            .dispatch(LifecycleCommand::Shutdown, SAMPLE)
            .await
            .unwrap_err();
        assert!(err.is_resolution());
        assert!(service.session().calls().is_empty());
    }

    #[tokio::test]
    async fn should_not_issue_command_when_listing_fails() {
        let session = InMemorySession {
            fail_listing: true,
            ..InMemorySession::with_domains(vec![sample_record()])
        };
        let service = DispatchService::new(session);
        let err = service
            .dispatch(LifecycleCommand::Reboot, SAMPLE)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "(query) failed to retrieve domains: connection reset"
        );
        assert!(service.session().calls().is_empty());
    }

    #[tokio::test]
    async fn should_refuse_listing_larger_than_limit() {
        let service = DispatchService::with_listing_limit(
            InMemorySession::with_domains(vec![
                sample_record(),
                random_record("a"),
                random_record("b"),
            ]),
            2,
        );
        let err = service
            .dispatch(LifecycleCommand::Reset, SAMPLE)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HostdError::Resolution(ResolutionError::ListingOverflow { count: 3, limit: 2 })
        ));
        assert!(service.session().calls().is_empty());
    }

    #[tokio::test]
    async fn should_accept_listing_at_exactly_the_limit() {
        let service = DispatchService::with_listing_limit(
            InMemorySession::with_domains(vec![random_record("a"), sample_record()]),
            2,
        );
        assert!(service.resolve(SAMPLE).await.is_ok());
    }

    #[tokio::test]
    async fn should_surface_command_failure_description() {
        let session = InMemorySession {
            fail_commands: true,
            ..InMemorySession::with_domains(vec![sample_record()])
        };
        let service = DispatchService::new(session);
        let err = service
            .dispatch(LifecycleCommand::Shutdown, SAMPLE)
            .await
            .unwrap_err();
        assert!(!err.is_resolution());
        assert_eq!(
            err.to_string(),
            "Requested operation is not valid: domain is not running"
        );
        assert_eq!(service.session().calls().len(), 1);
    }
}
