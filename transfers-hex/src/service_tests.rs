//! Application service unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use tokio::time::{Instant, timeout};

    use transfers_types::{
        AccountRepository, AppError, AuthorizationError, Authorizer, CreateUserRequest, Currency,
        Document, DocumentPayload, DocumentType, LedgerOp, Money, NewUser, NotificationError,
        Notifier, RepoError, Transfer, TransferCommand, TransferError, TransferId,
        TransferRepository, TypeUser, User, UserId, Wallet, WalletPayload,
    };

    use crate::{TransferService, UserService};

    /// In-memory repository. A ledger transaction applies its ops to a copy of
    /// the accounts and swaps it in only if every op succeeds.
    #[derive(Default)]
    pub struct MockRepo {
        users: Mutex<HashMap<UserId, User>>,
        transfers: Mutex<Vec<Transfer>>,
        fail_ledger: AtomicBool,
    }

    impl MockRepo {
        fn balance(&self, id: UserId) -> i64 {
            self.users.lock().unwrap()[&id].balance().amount()
        }

        fn transfer_count(&self) -> usize {
            self.transfers.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AccountRepository for MockRepo {
        async fn create_user(&self, user: &User) -> Result<(), RepoError> {
            let mut users = self.users.lock().unwrap();
            let duplicate = users.values().any(|u| {
                u.email == user.email || u.document.value() == user.document.value()
            });
            if duplicate {
                return Err(RepoError::Conflict("email or document already registered".into()));
            }
            users.insert(user.id, user.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepoError> {
            Ok(self.users.lock().unwrap().get(&id).cloned())
        }

        async fn update_balance(&self, id: UserId, balance: Money) -> Result<(), RepoError> {
            let mut users = self.users.lock().unwrap();
            let user = users.get_mut(&id).ok_or(RepoError::NotFound)?;
            let current = user.balance();
            if balance.amount() >= current.amount() {
                user.deposit(Money::new(balance.amount() - current.amount(), balance.currency())?)?;
            } else {
                user.withdraw(Money::new(current.amount() - balance.amount(), balance.currency())?)?;
            }
            Ok(())
        }
    }

    #[async_trait]
    impl TransferRepository for MockRepo {
        async fn insert(&self, transfer: &Transfer) -> Result<(), RepoError> {
            self.transfers.lock().unwrap().push(transfer.clone());
            Ok(())
        }

        async fn run_in_transaction(&self, ops: Vec<LedgerOp>) -> Result<(), RepoError> {
            if self.fail_ledger.load(Ordering::SeqCst) {
                return Err(RepoError::Transaction("connection reset".into()));
            }

            let mut users = self.users.lock().unwrap();
            let mut staged = users.clone();
            let mut records = Vec::new();
            for op in ops {
                match op {
                    LedgerOp::Debit { account, amount } => {
                        staged
                            .get_mut(&account)
                            .ok_or(RepoError::NotFound)?
                            .withdraw(amount)?;
                    }
                    LedgerOp::Credit { account, amount } => {
                        staged
                            .get_mut(&account)
                            .ok_or(RepoError::NotFound)?
                            .deposit(amount)?;
                    }
                    LedgerOp::Record(transfer) => records.push(transfer),
                }
            }
            *users = staged;
            self.transfers.lock().unwrap().extend(records);
            Ok(())
        }

        async fn find_transfer(&self, id: TransferId) -> Result<Option<Transfer>, RepoError> {
            Ok(self
                .transfers
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.id == id)
                .cloned())
        }

        async fn list_transfers_for_user(&self, user: UserId) -> Result<Vec<Transfer>, RepoError> {
            let mut found: Vec<Transfer> = self
                .transfers
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t.payer_id == user || t.payee_id == user)
                .cloned()
                .collect();
            found.reverse();
            Ok(found)
        }
    }

    #[derive(Clone, Copy)]
    enum Verdict {
        Approve,
        Deny,
        Unavailable,
    }

    struct ScriptedAuthorizer {
        verdict: Verdict,
        calls: AtomicU32,
        saw_deadline: AtomicBool,
    }

    impl ScriptedAuthorizer {
        fn new(verdict: Verdict) -> Arc<Self> {
            Arc::new(Self {
                verdict,
                calls: AtomicU32::new(0),
                saw_deadline: AtomicBool::new(false),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Authorizer for ScriptedAuthorizer {
        async fn authorize(
            &self,
            _transfer: &Transfer,
            deadline: Option<Instant>,
        ) -> Result<(), AuthorizationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.saw_deadline.store(deadline.is_some(), Ordering::SeqCst);
            match self.verdict {
                Verdict::Approve => Ok(()),
                Verdict::Deny => Err(AuthorizationError::Denied("authorizer answered \"Negado\"".into())),
                Verdict::Unavailable => Err(AuthorizationError::Failed("HTTP 500".into())),
            }
        }
    }

    struct RecordingNotifier {
        sent: mpsc::UnboundedSender<Transfer>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, transfer: &Transfer) -> Result<(), NotificationError> {
            let _ = self.sent.send(transfer.clone());
            if self.fail {
                return Err(NotificationError::Enqueue("queue unavailable".into()));
            }
            Ok(())
        }
    }

    struct Harness {
        repo: Arc<MockRepo>,
        authorizer: Arc<ScriptedAuthorizer>,
        notifications: mpsc::UnboundedReceiver<Transfer>,
        service: TransferService<MockRepo>,
    }

    fn harness(verdict: Verdict, notifier_fails: bool) -> Harness {
        let repo = Arc::new(MockRepo::default());
        let authorizer = ScriptedAuthorizer::new(verdict);
        let (sent, notifications) = mpsc::unbounded_channel();
        let notifier = Arc::new(RecordingNotifier {
            sent,
            fail: notifier_fails,
        });
        let service = TransferService::new(repo.clone(), authorizer.clone(), notifier);
        Harness {
            repo,
            authorizer,
            notifications,
            service,
        }
    }

    static DOCUMENT_SEQ: AtomicU32 = AtomicU32::new(1);

    fn seed_user(repo: &MockRepo, type_user: TypeUser, balance: i64) -> UserId {
        let n = DOCUMENT_SEQ.fetch_add(1, Ordering::SeqCst);
        let user = User::new(NewUser {
            full_name: format!("User {n}"),
            email: format!("user{n}@example.com"),
            password_hash: "$argon2id$stub".into(),
            document: Document::new(DocumentType::Cpf, format!("{n:011}")).unwrap(),
            wallet: Wallet::new(Money::brl(balance).unwrap()),
            type_user,
        });
        let id = user.id;
        repo.users.lock().unwrap().insert(id, user);
        id
    }

    fn command(payer: UserId, payee: UserId, value: i64) -> TransferCommand {
        TransferCommand {
            payer_id: payer,
            payee_id: payee,
            value: Money::brl(value).unwrap(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // TransferService
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_transfer_moves_money_and_notifies() {
        let mut h = harness(Verdict::Approve, false);
        let payer = seed_user(&h.repo, TypeUser::Common, 10_000);
        let payee = seed_user(&h.repo, TypeUser::Merchant, 500);

        let transfer = h.service.transfer(command(payer, payee, 2_500)).await.unwrap();

        assert_eq!(transfer.payer_id, payer);
        assert_eq!(transfer.payee_id, payee);
        assert_eq!(transfer.value.amount(), 2_500);
        assert_eq!(h.repo.balance(payer), 7_500);
        assert_eq!(h.repo.balance(payee), 3_000);
        assert_eq!(h.authorizer.calls(), 1);

        let stored = h.service.get_transfer(transfer.id).await.unwrap();
        assert_eq!(stored, transfer);

        let notified = timeout(Duration::from_secs(1), h.notifications.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(notified, transfer);
    }

    #[tokio::test]
    async fn test_self_transfer_is_rejected() {
        let h = harness(Verdict::Approve, false);
        let payer = seed_user(&h.repo, TypeUser::Common, 10_000);

        let err = h.service.transfer(command(payer, payer, 100)).await.unwrap_err();

        assert_eq!(err, TransferError::SelfTransfer);
        assert_eq!(h.authorizer.calls(), 0);
        assert_eq!(h.repo.balance(payer), 10_000);
    }

    #[tokio::test]
    async fn test_zero_value_is_rejected() {
        let h = harness(Verdict::Approve, false);
        let payer = seed_user(&h.repo, TypeUser::Common, 10_000);
        let payee = seed_user(&h.repo, TypeUser::Common, 0);

        let err = h.service.transfer(command(payer, payee, 0)).await.unwrap_err();
        assert_eq!(err, TransferError::InvalidValue);
    }

    #[tokio::test]
    async fn test_missing_parties() {
        let h = harness(Verdict::Approve, false);
        let known = seed_user(&h.repo, TypeUser::Common, 10_000);
        let unknown = UserId::new();

        let err = h.service.transfer(command(unknown, known, 100)).await.unwrap_err();
        assert_eq!(err, TransferError::PayerNotFound(unknown));

        let err = h.service.transfer(command(known, unknown, 100)).await.unwrap_err();
        assert_eq!(err, TransferError::PayeeNotFound(unknown));
        assert_eq!(h.authorizer.calls(), 0);
    }

    #[tokio::test]
    async fn test_merchant_cannot_send_even_without_balance() {
        let h = harness(Verdict::Approve, false);
        let merchant = seed_user(&h.repo, TypeUser::Merchant, 0);
        let payee = seed_user(&h.repo, TypeUser::Common, 0);

        let err = h.service.transfer(command(merchant, payee, 100)).await.unwrap_err();

        assert_eq!(err, TransferError::RoleNotAllowed(merchant));
        assert_eq!(h.authorizer.calls(), 0);
    }

    #[tokio::test]
    async fn test_insufficient_balance_skips_authorizer() {
        let h = harness(Verdict::Approve, false);
        let payer = seed_user(&h.repo, TypeUser::Common, 99);
        let payee = seed_user(&h.repo, TypeUser::Common, 0);

        let err = h.service.transfer(command(payer, payee, 100)).await.unwrap_err();

        assert_eq!(
            err,
            TransferError::InsufficientBalance {
                available: 99,
                requested: 100
            }
        );
        assert_eq!(h.authorizer.calls(), 0);
        assert_eq!(h.repo.transfer_count(), 0);
    }

    #[tokio::test]
    async fn test_payee_overflow_is_refused_before_authorizing() {
        let h = harness(Verdict::Approve, false);
        let payer = seed_user(&h.repo, TypeUser::Common, 1_000);
        let payee = seed_user(&h.repo, TypeUser::Common, i64::MAX - 10);

        let err = h.service.transfer(command(payer, payee, 400)).await.unwrap_err();

        assert_eq!(
            err,
            TransferError::PayeeOverflow {
                balance: i64::MAX - 10,
                requested: 400
            }
        );
        assert_eq!(h.authorizer.calls(), 0);
        assert_eq!(h.repo.balance(payer), 1_000);
        assert_eq!(h.repo.balance(payee), i64::MAX - 10);
    }

    #[tokio::test]
    async fn test_denied_authorization_writes_nothing() {
        let mut h = harness(Verdict::Deny, false);
        let payer = seed_user(&h.repo, TypeUser::Common, 10_000);
        let payee = seed_user(&h.repo, TypeUser::Common, 0);

        let err = h.service.transfer(command(payer, payee, 100)).await.unwrap_err();

        assert!(matches!(err, TransferError::AuthorizationDenied(_)));
        assert_eq!(h.repo.balance(payer), 10_000);
        assert_eq!(h.repo.balance(payee), 0);
        assert_eq!(h.repo.transfer_count(), 0);
        assert!(h.notifications.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unavailable_authorizer_aborts() {
        let h = harness(Verdict::Unavailable, false);
        let payer = seed_user(&h.repo, TypeUser::Common, 10_000);
        let payee = seed_user(&h.repo, TypeUser::Common, 0);

        let err = h.service.transfer(command(payer, payee, 100)).await.unwrap_err();

        assert_eq!(err, TransferError::AuthorizationFailed("HTTP 500".into()));
        assert_eq!(h.repo.balance(payer), 10_000);
    }

    #[tokio::test]
    async fn test_auth_budget_becomes_deadline() {
        let h = harness(Verdict::Approve, false);
        let payer = seed_user(&h.repo, TypeUser::Common, 10_000);
        let payee = seed_user(&h.repo, TypeUser::Common, 0);

        h.service.transfer(command(payer, payee, 100)).await.unwrap();
        assert!(!h.authorizer.saw_deadline.load(Ordering::SeqCst));

        let (sent, _rx) = mpsc::unbounded_channel();
        let budgeted = TransferService::new(
            h.repo.clone(),
            h.authorizer.clone(),
            Arc::new(RecordingNotifier { sent, fail: false }),
        )
        .with_auth_budget(Duration::from_secs(2));
        budgeted.transfer(command(payer, payee, 100)).await.unwrap();
        assert!(h.authorizer.saw_deadline.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_ledger_failure_is_storage_error() {
        let h = harness(Verdict::Approve, false);
        let payer = seed_user(&h.repo, TypeUser::Common, 10_000);
        let payee = seed_user(&h.repo, TypeUser::Common, 0);
        h.repo.fail_ledger.store(true, Ordering::SeqCst);

        let err = h.service.transfer(command(payer, payee, 100)).await.unwrap_err();

        assert!(matches!(err, TransferError::Storage(_)));
        assert_eq!(h.repo.balance(payer), 10_000);
        assert_eq!(h.repo.transfer_count(), 0);
    }

    #[tokio::test]
    async fn test_notification_failure_keeps_transfer() {
        let mut h = harness(Verdict::Approve, true);
        let payer = seed_user(&h.repo, TypeUser::Common, 10_000);
        let payee = seed_user(&h.repo, TypeUser::Common, 0);

        let transfer = h.service.transfer(command(payer, payee, 100)).await.unwrap();

        timeout(Duration::from_secs(1), h.notifications.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(h.repo.balance(payer), 9_900);
        assert_eq!(h.service.get_transfer(transfer.id).await.unwrap(), transfer);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_transfers_never_overdraw() {
        let h = harness(Verdict::Approve, false);
        let payer = seed_user(&h.repo, TypeUser::Common, 1_000);
        let payee = seed_user(&h.repo, TypeUser::Common, 0);
        let service = Arc::new(h.service);

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.transfer(command(payer, payee, 300)).await })
            })
            .collect();

        let mut committed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => committed += 1,
                Err(e) => assert!(
                    matches!(e, TransferError::InsufficientBalance { .. }),
                    "unexpected error: {e:?}"
                ),
            }
        }

        assert_eq!(committed, 3);
        assert_eq!(h.repo.balance(payer), 100);
        assert_eq!(h.repo.balance(payee), 900);
        assert_eq!(h.repo.transfer_count(), 3);
    }

    #[tokio::test]
    async fn test_list_for_user() {
        let h = harness(Verdict::Approve, false);
        let a = seed_user(&h.repo, TypeUser::Common, 10_000);
        let b = seed_user(&h.repo, TypeUser::Common, 10_000);
        let c = seed_user(&h.repo, TypeUser::Common, 10_000);

        let first = h.service.transfer(command(a, b, 100)).await.unwrap();
        let second = h.service.transfer(command(c, a, 200)).await.unwrap();
        h.service.transfer(command(b, c, 300)).await.unwrap();

        let listed = h.service.list_for_user(a).await.unwrap();
        assert_eq!(listed, vec![second, first]);

        let err = h.service.list_for_user(UserId::new()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_transfer_is_not_found() {
        let h = harness(Verdict::Approve, false);
        let err = h.service.get_transfer(TransferId::new()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // UserService
    // ─────────────────────────────────────────────────────────────────────────

    fn user_request(email: &str, document: &str, type_user: &str) -> CreateUserRequest {
        CreateUserRequest {
            full_name: "Joana Souza".into(),
            email: email.into(),
            password: "hunter2".into(),
            document: DocumentPayload {
                kind: "CPF".into(),
                value: document.into(),
            },
            wallet: WalletPayload {
                currency: "BRL".into(),
                amount: 5_000,
            },
            type_user: type_user.into(),
        }
    }

    #[tokio::test]
    async fn test_create_user_derives_roles_and_hashes_password() {
        let repo = Arc::new(MockRepo::default());
        let users = UserService::new(repo.clone());

        let merchant = users
            .create_user(user_request("shop@example.com", "111.222.333-44", "merchant"))
            .await
            .unwrap();

        assert_eq!(merchant.type_user, TypeUser::Merchant);
        assert!(!merchant.roles.can_transfer);
        assert_eq!(merchant.balance(), Money::new(5_000, Currency::BRL).unwrap());
        assert!(merchant.password_hash.starts_with("$argon2"));
        assert_ne!(merchant.password_hash, "hunter2");

        let fetched = users.get_user(merchant.id).await.unwrap();
        assert_eq!(fetched.email, "shop@example.com");
    }

    #[tokio::test]
    async fn test_create_user_reports_every_problem() {
        let users = UserService::new(Arc::new(MockRepo::default()));
        let mut req = user_request("nope", "12", "ADMIN");
        req.full_name = "  ".into();

        let err = users.create_user(req).await.unwrap_err();

        match err {
            AppError::Validation(errors) => assert_eq!(errors.len(), 4, "{errors:?}"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_user_conflicts() {
        let users = UserService::new(Arc::new(MockRepo::default()));
        users
            .create_user(user_request("a@example.com", "555.666.777-88", "COMMON"))
            .await
            .unwrap();

        let err = users
            .create_user(user_request("a@example.com", "999.888.777-66", "COMMON"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let users = UserService::new(Arc::new(MockRepo::default()));
        let err = users.get_user(UserId::new()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
