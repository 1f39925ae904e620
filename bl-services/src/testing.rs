//! In-memory `BookingApi` double for service tests.
//!
//! The mock plays the server: it holds its own authoritative copies of
//! the records and runs real transitions on them, while counting every
//! call so tests can assert network behavior (exactly one order-creation
//! call, zero calls on a client-side referral rejection, and so on).

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use bl_api::{BookingApi, CreateBookingRequest, PaymentProof, StatusAction};
use bl_core::error::{BlError, BlResult};
use bl_models::{
    Actor, BookingRecord, BookingStateMachine, DeliveryMode, ServiceDescriptor,
    TransitionPolicy, Trigger,
};

/// A requested booking fixture.
pub fn sample_record(id: &str) -> BookingRecord {
    BookingRecord::new_request(
        id,
        "seeker-1",
        "provider-1",
        ServiceDescriptor { name: "Boiler service".into(), category: Some("plumbing".into()) },
        Utc::now(),
        2,
        DeliveryMode::InPerson { location: "4 Vine St".into() },
        3000,
    )
}

/// Server-playing mock with call counting and injectable failures.
pub struct MockApi {
    records: Mutex<HashMap<String, BookingRecord>>,
    call_counts: Mutex<HashMap<&'static str, usize>>,
    queued_errors: Mutex<HashMap<&'static str, VecDeque<BlError>>>,
    expected_otp: Mutex<HashMap<String, String>>,
    acting_as: Mutex<Actor>,
    next_order: Mutex<u64>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            call_counts: Mutex::new(HashMap::new()),
            queued_errors: Mutex::new(HashMap::new()),
            expected_otp: Mutex::new(HashMap::new()),
            acting_as: Mutex::new(Actor::Seeker),
            next_order: Mutex::new(0),
        }
    }

    /// Install a record on the "server".
    pub fn seed(&self, record: BookingRecord) {
        self.records.lock().unwrap().insert(record.id.clone(), record);
    }

    /// Read back the server's copy of a record.
    pub fn server_record(&self, id: &str) -> Option<BookingRecord> {
        self.records.lock().unwrap().get(id).cloned()
    }

    /// How many times the named method has been called.
    pub fn calls(&self, method: &str) -> usize {
        *self.call_counts.lock().unwrap().get(method).unwrap_or(&0)
    }

    /// Queue an error to be returned by the next call to `method`.
    pub fn queue_error(&self, method: &'static str, error: BlError) {
        self.queued_errors
            .lock()
            .unwrap()
            .entry(method)
            .or_default()
            .push_back(error);
    }

    /// Set the OTP the server expects for a booking. Without an
    /// expectation any code is accepted.
    pub fn expect_otp(&self, booking_id: &str, code: &str) {
        self.expected_otp
            .lock()
            .unwrap()
            .insert(booking_id.to_string(), code.to_string());
    }

    /// Which actor the mock's auth context represents.
    pub fn act_as(&self, actor: Actor) {
        *self.acting_as.lock().unwrap() = actor;
    }

    fn record_call(&self, method: &'static str) -> BlResult<()> {
        *self.call_counts.lock().unwrap().entry(method).or_insert(0) += 1;
        if let Some(errors) = self.queued_errors.lock().unwrap().get_mut(method) {
            if let Some(error) = errors.pop_front() {
                return Err(error);
            }
        }
        Ok(())
    }

    fn apply(&self, id: &str, trigger: &Trigger) -> BlResult<BookingRecord> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(id)
            .ok_or_else(|| BlError::BookingNotFound(id.to_string()))?;
        BookingStateMachine::apply(record, trigger, &TransitionPolicy::default())?;
        Ok(record.clone())
    }
}

#[async_trait]
impl BookingApi for MockApi {
    async fn create_booking(&self, req: &CreateBookingRequest) -> BlResult<BookingRecord> {
        self.record_call("create_booking")?;
        let id = format!("bk-{}", uuid::Uuid::new_v4());
        let record = BookingRecord::new_request(
            id.clone(),
            "seeker-1",
            req.provider_id.clone(),
            req.service.clone(),
            req.scheduled_at,
            req.duration_hours,
            req.delivery.clone(),
            req.amount,
        );
        self.records.lock().unwrap().insert(id, record.clone());
        Ok(record)
    }

    async fn fetch_booking(&self, id: &str) -> BlResult<BookingRecord> {
        self.record_call("fetch_booking")?;
        self.server_record(id)
            .ok_or_else(|| BlError::BookingNotFound(id.to_string()))
    }

    async fn update_status(&self, id: &str, action: &StatusAction) -> BlResult<BookingRecord> {
        self.record_call("update_status")?;
        let trigger = match action {
            StatusAction::Accept { amount } => Trigger::Accept { amount: *amount },
            StatusAction::Reject => Trigger::Reject,
            StatusAction::Cancel { reason } => Trigger::Cancel { reason: reason.clone() },
        };
        self.apply(id, &trigger)
    }

    async fn refer_booking(
        &self,
        id: &str,
        to_provider: &str,
        note: Option<&str>,
    ) -> BlResult<BookingRecord> {
        self.record_call("refer_booking")?;
        self.apply(
            id,
            &Trigger::Refer {
                to_provider: to_provider.to_string(),
                note: note.map(String::from),
                amount: None,
            },
        )
    }

    async fn start_booking(&self, id: &str, otp_code: &str) -> BlResult<BookingRecord> {
        self.record_call("start_booking")?;
        if let Some(expected) = self.expected_otp.lock().unwrap().get(id) {
            if expected != otp_code {
                return Err(BlError::OtpMismatch(id.to_string()));
            }
        }
        self.apply(id, &Trigger::Start)
    }

    async fn submit_attendance(
        &self,
        id: &str,
        attended: bool,
        note: Option<&str>,
    ) -> BlResult<BookingRecord> {
        self.record_call("submit_attendance")?;
        let actor = *self.acting_as.lock().unwrap();
        self.apply(
            id,
            &Trigger::ConfirmAttendance { actor, attended, note: note.map(String::from) },
        )
    }

    async fn create_payment_order(&self, id: &str) -> BlResult<String> {
        self.record_call("create_payment_order")?;
        let order_ref = {
            let mut next = self.next_order.lock().unwrap();
            *next += 1;
            format!("ord-{next}")
        };
        self.apply(id, &Trigger::PaymentOrderAttached { order_ref: order_ref.clone() })?;
        Ok(order_ref)
    }

    async fn verify_payment(&self, id: &str, _proof: &PaymentProof) -> BlResult<BookingRecord> {
        self.record_call("verify_payment")?;
        self.apply(id, &Trigger::PaymentVerified)
    }
}
