//! Transaction construction and recording

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::tax::gst::gross_to_exclusive;
use crate::traits::*;
use crate::types::*;

/// Transaction manager for recording validated transactions
pub struct TransactionManager<S: LedgerStorage> {
    storage: S,
    validator: Box<dyn TransactionValidator>,
}

impl<S: LedgerStorage> TransactionManager<S> {
    /// Create a new transaction manager
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultTransactionValidator),
        }
    }

    /// Create a new transaction manager with a custom validator
    pub fn with_validator(storage: S, validator: Box<dyn TransactionValidator>) -> Self {
        Self { storage, validator }
    }

    /// Record a new transaction
    pub async fn record_transaction(&mut self, mut transaction: Transaction) -> LedgerResult<()> {
        self.validator.validate_transaction(&transaction)?;

        for posting in &transaction.postings {
            if self.storage.get_account(&posting.account_id).await?.is_none() {
                return Err(LedgerError::AccountNotFound(posting.account_id.clone()));
            }
        }

        transaction.updated_at = chrono::Utc::now().naive_utc();
        self.storage.save_transaction(&transaction).await
    }

    /// Get a transaction by ID, returning an error if not found
    pub async fn get_transaction_required(
        &self,
        transaction_id: &str,
    ) -> LedgerResult<Transaction> {
        self.storage
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| LedgerError::TransactionNotFound(transaction_id.to_string()))
    }
}

/// Transaction builder for assembling multi-posting transactions
///
/// Posting ids are derived from the transaction id and posting position,
/// so a rebuilt transaction gets identical ids.
#[derive(Debug)]
pub struct TransactionBuilder {
    transaction: Transaction,
}

impl TransactionBuilder {
    /// Create a new transaction builder
    pub fn new(id: String, date: NaiveDate, payee: String) -> Self {
        Self {
            transaction: Transaction::new(id, date, payee),
        }
    }

    /// Set the memo for the transaction
    pub fn memo(mut self, memo: String) -> Self {
        self.transaction.memo = Some(memo);
        self
    }

    /// Add a tag to the transaction
    pub fn tag(mut self, tag: String) -> Self {
        self.transaction.tags.push(tag);
        self
    }

    /// Add metadata to the transaction
    pub fn metadata(mut self, key: String, value: String) -> Self {
        self.transaction.metadata.insert(key, value);
        self
    }

    fn next_posting_id(&self) -> String {
        format!("{}-p{}", self.transaction.id, self.transaction.postings.len() + 1)
    }

    /// Add a plain signed posting
    pub fn posting(mut self, account_id: String, amount: BigDecimal) -> Self {
        let posting = Posting::new(
            self.next_posting_id(),
            self.transaction.id.clone(),
            account_id,
            amount,
        );
        self.transaction.add_posting(posting);
        self
    }

    /// Add a business posting carrying GST split metadata
    ///
    /// `amount` is the GST-exclusive leg; `gst_amount` is the portion the
    /// paired control-account posting carries.
    pub fn gst_posting(
        mut self,
        account_id: String,
        amount: BigDecimal,
        gst_code: String,
        gst_rate: BigDecimal,
        gst_amount: BigDecimal,
    ) -> Self {
        let mut posting = Posting::new(
            self.next_posting_id(),
            self.transaction.id.clone(),
            account_id,
            amount,
        );
        posting.is_business = true;
        posting.gst_code = Some(gst_code);
        posting.gst_rate = Some(gst_rate);
        posting.gst_amount = Some(gst_amount);
        self.transaction.add_posting(posting);
        self
    }

    /// Add a business posting without GST metadata (GST-free supplies)
    pub fn business_posting(mut self, account_id: String, amount: BigDecimal) -> Self {
        let mut posting = Posting::new(
            self.next_posting_id(),
            self.transaction.id.clone(),
            account_id,
            amount,
        );
        posting.is_business = true;
        self.transaction.add_posting(posting);
        self
    }

    /// Build the transaction, validating the double-entry invariants
    pub fn build(self) -> LedgerResult<Transaction> {
        self.transaction.validate()?;
        Ok(self.transaction)
    }
}

/// Common transaction patterns
pub mod patterns {
    use super::*;

    /// GST treatment code used by the split patterns
    pub const GST_CODE: &str = "GST";

    /// Move money between two transfer accounts
    pub fn create_transfer(
        id: String,
        date: NaiveDate,
        payee: String,
        from_account_id: String,
        to_account_id: String,
        amount: BigDecimal,
    ) -> LedgerResult<Transaction> {
        TransactionBuilder::new(id, date, payee)
            .posting(from_account_id, -amount.clone())
            .posting(to_account_id, amount)
            .build()
    }

    /// Simple personal spend: money leaves the bank account into a category
    pub fn create_expense(
        id: String,
        date: NaiveDate,
        payee: String,
        bank_account_id: String,
        category_account_id: String,
        amount: BigDecimal,
    ) -> LedgerResult<Transaction> {
        TransactionBuilder::new(id, date, payee)
            .posting(bank_account_id, -amount.clone())
            .posting(category_account_id, amount)
            .build()
    }

    /// Business purchase with the gross split into expense and GST Paid legs
    ///
    /// The bank posting preserves the original cash movement; the expense
    /// leg carries the GST metadata and the control account receives the
    /// GST portion.
    pub fn create_business_purchase_with_gst(
        id: String,
        date: NaiveDate,
        payee: String,
        bank_account_id: String,
        expense_account_id: String,
        gst_paid_account_id: String,
        gross: BigDecimal,
        gst_rate: BigDecimal,
    ) -> LedgerResult<Transaction> {
        let split = gross_to_exclusive(&gross, &gst_rate);
        let mut builder = TransactionBuilder::new(id, date, payee)
            .posting(bank_account_id, -gross)
            .gst_posting(
                expense_account_id,
                split.exclusive,
                GST_CODE.to_string(),
                gst_rate,
                split.gst.clone(),
            );
        if split.gst != BigDecimal::from(0) {
            builder = builder.business_posting(gst_paid_account_id, split.gst);
        }
        builder.build()
    }

    /// Business sale with the gross split into income and GST Collected legs
    pub fn create_business_sale_with_gst(
        id: String,
        date: NaiveDate,
        payee: String,
        bank_account_id: String,
        income_account_id: String,
        gst_collected_account_id: String,
        gross: BigDecimal,
        gst_rate: BigDecimal,
    ) -> LedgerResult<Transaction> {
        let split = gross_to_exclusive(&gross, &gst_rate);
        let mut builder = TransactionBuilder::new(id, date, payee)
            .posting(bank_account_id, gross)
            .gst_posting(
                income_account_id,
                -split.exclusive,
                GST_CODE.to_string(),
                gst_rate,
                split.gst.clone(),
            );
        if split.gst != BigDecimal::from(0) {
            builder = builder.business_posting(gst_collected_account_id, -split.gst);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_builder_balanced_transaction() {
        let txn = TransactionBuilder::new(
            "txn1".to_string(),
            date(2025, 1, 15),
            "Woolworths".to_string(),
        )
        .posting("bank".to_string(), dec("-125.50"))
        .posting("groceries".to_string(), dec("125.50"))
        .build()
        .unwrap();

        assert_eq!(txn.postings.len(), 2);
        assert_eq!(txn.postings[0].id, "txn1-p1");
        assert!(txn.is_balanced());
        assert_eq!(txn.account_amount("bank"), dec("-125.50"));
    }

    #[test]
    fn test_builder_rejects_unbalanced() {
        let result = TransactionBuilder::new(
            "txn1".to_string(),
            date(2025, 1, 15),
            "Oops".to_string(),
        )
        .posting("bank".to_string(), dec("-100.00"))
        .posting("groceries".to_string(), dec("95.00"))
        .build();

        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[test]
    fn test_builder_rejects_single_posting() {
        let result =
            TransactionBuilder::new("txn1".to_string(), date(2025, 1, 15), "Half".to_string())
                .posting("bank".to_string(), dec("-100.00"))
                .build();

        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[test]
    fn test_purchase_with_gst_preserves_cash_movement() {
        let txn = patterns::create_business_purchase_with_gst(
            "txn2".to_string(),
            date(2025, 1, 20),
            "Officeworks".to_string(),
            "bank".to_string(),
            "office-supplies".to_string(),
            "gst-paid".to_string(),
            dec("125.50"),
            dec("0.1"),
        )
        .unwrap();

        assert_eq!(txn.account_amount("bank"), dec("-125.50"));
        assert_eq!(txn.account_amount("office-supplies"), dec("114.09"));
        assert_eq!(txn.account_amount("gst-paid"), dec("11.41"));
        assert!(txn.is_balanced());

        let expense = &txn.postings[1];
        assert!(expense.has_gst());
        assert_eq!(expense.gst_amount, Some(dec("11.41")));
    }

    #[test]
    fn test_sale_with_gst_is_balanced() {
        let txn = patterns::create_business_sale_with_gst(
            "txn3".to_string(),
            date(2025, 2, 1),
            "Client Pty Ltd".to_string(),
            "bank".to_string(),
            "consulting-income".to_string(),
            "gst-collected".to_string(),
            dec("1100.00"),
            dec("0.1"),
        )
        .unwrap();

        assert_eq!(txn.account_amount("bank"), dec("1100.00"));
        assert_eq!(txn.account_amount("consulting-income"), dec("-1000.00"));
        assert_eq!(txn.account_amount("gst-collected"), dec("-100.00"));
        assert!(txn.is_balanced());
    }

    #[test]
    fn test_gst_mismatch_fails_validation() {
        let mut txn = Transaction::new(
            "txn4".to_string(),
            date(2025, 3, 1),
            "Broken import".to_string(),
        );
        let mut expense = Posting::new(
            "txn4-p1".to_string(),
            "txn4".to_string(),
            "supplies".to_string(),
            dec("100.00"),
        );
        expense.is_business = true;
        expense.gst_code = Some("GST".to_string());
        expense.gst_rate = Some(dec("0.1"));
        // Way off: should be ~10.00 for a 110.00 gross
        expense.gst_amount = Some(dec("25.00"));
        txn.add_posting(expense);
        txn.add_posting(Posting::new(
            "txn4-p2".to_string(),
            "txn4".to_string(),
            "bank".to_string(),
            dec("-100.00"),
        ));

        assert!(matches!(txn.validate(), Err(LedgerError::Validation(_))));
    }
}
