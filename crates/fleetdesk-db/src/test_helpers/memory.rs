//! In-memory repository implementations for testing
//!
//! One [`InMemoryStore`] holds every table behind a single mutex, which lets
//! cross-table operations (car cascade delete, client image sync) behave the
//! way their Postgres counterparts do.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleetdesk_core::constants::page_size;
use fleetdesk_core::models::{
    Booking, BookingFilter, BookingStatus, Car, CarFilter, CarStatus, Client, ClientFilter,
    ClientStatus, CreateCarRequest, CreateClientRequest, CreatePaymentRequest, DocumentScan,
    DocumentType, EntityKind, NewBooking, NewDocumentScan, Payment, ProcessingStatus,
    UploadSession, UploadStatus, UploadToken,
};
use fleetdesk_core::AppError;
use uuid::Uuid;

use crate::db::booking::overlap_conflict;
use crate::repository::{
    BookingRepository, CarDeleteOutcome, CarDeletion, CarRepository, ClientRepository,
    DocumentScanRepository, UploadSessionRepository, UploadTokenRepository,
};

#[derive(Default)]
struct Tables {
    clients: HashMap<Uuid, Client>,
    cars: HashMap<Uuid, Car>,
    bookings: HashMap<Uuid, Booking>,
    payments: Vec<Payment>,
    tokens: HashMap<(EntityKind, Uuid), UploadToken>,
    sessions: HashMap<(EntityKind, Uuid), UploadSession>,
    scans: Vec<DocumentScan>,
}

/// Shared in-memory backing for every repository trait.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    fail_scan_inserts: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every audit insert fail, to exercise best-effort paths.
    pub fn fail_scan_inserts(&self, fail: bool) {
        self.fail_scan_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn token_count(&self, kind: EntityKind, entity_id: Uuid) -> usize {
        self.tables()
            .tokens
            .values()
            .filter(|t| t.kind == kind && t.entity_id == entity_id)
            .count()
    }

    pub fn session_count(&self, kind: EntityKind, entity_id: Uuid) -> usize {
        self.tables()
            .sessions
            .values()
            .filter(|s| s.kind == kind && s.entity_id == entity_id)
            .count()
    }

    pub fn scan_count(&self, kind: EntityKind, entity_id: Uuid) -> usize {
        self.tables()
            .scans
            .iter()
            .filter(|s| s.entity_kind == kind && s.entity_id == entity_id)
            .count()
    }

    /// Overwrite a token's stored expiry.
    pub fn set_token_expiry(&self, kind: EntityKind, id: Uuid, expires_at: DateTime<Utc>) {
        if let Some(token) = self.tables().tokens.get_mut(&(kind, id)) {
            token.expires_at = expires_at;
        }
    }

    /// Overwrite the raw status columns of a session.
    pub fn set_session_statuses(
        &self,
        kind: EntityKind,
        session_id: Uuid,
        upload: UploadStatus,
        processing: ProcessingStatus,
    ) {
        if let Some(session) = self.tables().sessions.get_mut(&(kind, session_id)) {
            session.upload_status = upload;
            session.processing_status = processing;
        }
    }
}

#[async_trait]
impl ClientRepository for InMemoryStore {
    async fn create(&self, request: &CreateClientRequest) -> Result<Client, AppError> {
        let mut tables = self.tables();
        if tables
            .clients
            .values()
            .any(|c| c.email.eq_ignore_ascii_case(&request.email))
        {
            return Err(AppError::Conflict(
                "A client with this email already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let client = Client {
            id: Uuid::new_v4(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            email: request.email.clone(),
            phone: request.phone.clone(),
            address: request.address.clone(),
            date_of_birth: request.date_of_birth,
            id_card_number: request.id_card_number.clone(),
            id_card_expiry: request.id_card_expiry,
            license_number: request.license_number.clone(),
            license_expiry: request.license_expiry,
            id_card_front_url: None,
            id_card_back_url: None,
            license_front_url: None,
            license_back_url: None,
            status: ClientStatus::Active,
            created_at: now,
            updated_at: now,
        };
        tables.clients.insert(client.id, client.clone());
        Ok(client)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Client>, AppError> {
        Ok(self.tables().clients.get(&id).cloned())
    }

    async fn list(&self, filter: &ClientFilter) -> Result<Vec<Client>, AppError> {
        let needle = filter
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut clients: Vec<Client> = self
            .tables()
            .clients
            .values()
            .filter(|c| filter.status.map_or(true, |s| c.status == s))
            .filter(|c| {
                needle.as_ref().map_or(true, |n| {
                    c.first_name.to_lowercase().contains(n)
                        || c.last_name.to_lowercase().contains(n)
                        || c.email.to_lowercase().contains(n)
                        || c.phone.as_deref().is_some_and(|p| p.contains(n.as_str()))
                })
            })
            .cloned()
            .collect();
        clients.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(clients
            .into_iter()
            .skip(filter.offset.unwrap_or(0).max(0) as usize)
            .take(page_size(filter.limit) as usize)
            .collect())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: ClientStatus,
    ) -> Result<Option<Client>, AppError> {
        let mut tables = self.tables();
        Ok(tables.clients.get_mut(&id).map(|c| {
            c.status = status;
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn set_document_url(
        &self,
        id: Uuid,
        document_type: DocumentType,
        url: &str,
    ) -> Result<bool, AppError> {
        if document_type.kind() != EntityKind::Client {
            return Err(AppError::InvalidInput(format!(
                "Document type '{}' does not belong to a client",
                document_type
            )));
        }
        let mut tables = self.tables();
        Ok(match tables.clients.get_mut(&id) {
            Some(client) => {
                client.set_document_url(document_type, url.to_string());
                client.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn sync_images(&self, id: Uuid) -> Result<Option<Client>, AppError> {
        let mut tables = self.tables();

        let mut sessions: Vec<UploadSession> = tables
            .sessions
            .values()
            .filter(|s| s.kind == EntityKind::Client && s.entity_id == id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        let mut latest: BTreeMap<DocumentType, String> = BTreeMap::new();
        for session in &sessions {
            for (doc, url) in &session.documents {
                latest.entry(*doc).or_insert_with(|| url.clone());
            }
        }

        Ok(tables.clients.get_mut(&id).map(|client| {
            for (doc, url) in latest {
                client.set_document_url(doc, url);
            }
            client.updated_at = Utc::now();
            client.clone()
        }))
    }
}

#[async_trait]
impl CarRepository for InMemoryStore {
    async fn create(&self, request: &CreateCarRequest) -> Result<Car, AppError> {
        let mut tables = self.tables();
        if tables
            .cars
            .values()
            .any(|c| c.plate_number == request.plate_number)
        {
            return Err(AppError::Conflict(
                "A car with this plate number already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let car = Car {
            id: Uuid::new_v4(),
            brand: request.brand.clone(),
            model: request.model.clone(),
            year: request.year,
            plate_number: request.plate_number.clone(),
            color: request.color.clone(),
            daily_rate: request.daily_rate,
            registration_url: None,
            insurance_url: None,
            inspection_url: None,
            photo_url: None,
            status: CarStatus::Available,
            created_at: now,
            updated_at: now,
        };
        tables.cars.insert(car.id, car.clone());
        Ok(car)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Car>, AppError> {
        Ok(self.tables().cars.get(&id).cloned())
    }

    async fn list(&self, filter: &CarFilter) -> Result<Vec<Car>, AppError> {
        let mut cars: Vec<Car> = self
            .tables()
            .cars
            .values()
            .filter(|c| filter.status.map_or(true, |s| c.status == s))
            .cloned()
            .collect();
        cars.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(cars
            .into_iter()
            .skip(filter.offset.unwrap_or(0).max(0) as usize)
            .take(page_size(filter.limit) as usize)
            .collect())
    }

    async fn update_status(&self, id: Uuid, status: CarStatus) -> Result<Option<Car>, AppError> {
        let mut tables = self.tables();
        Ok(tables.cars.get_mut(&id).map(|c| {
            c.status = status;
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn set_document_url(
        &self,
        id: Uuid,
        document_type: DocumentType,
        url: &str,
    ) -> Result<bool, AppError> {
        Ok(self
            .update_documents(id, &[(document_type, url.to_string())])
            .await?
            .is_some())
    }

    async fn update_documents(
        &self,
        id: Uuid,
        updates: &[(DocumentType, String)],
    ) -> Result<Option<Car>, AppError> {
        if let Some((doc, _)) = updates.iter().find(|(d, _)| d.kind() != EntityKind::Car) {
            return Err(AppError::InvalidInput(format!(
                "Document type '{}' does not belong to a car",
                doc
            )));
        }
        let mut tables = self.tables();
        Ok(tables.cars.get_mut(&id).map(|car| {
            for (doc, url) in updates {
                car.set_document_url(*doc, url.clone());
            }
            car.updated_at = Utc::now();
            car.clone()
        }))
    }

    async fn delete_with_dependents(&self, id: Uuid) -> Result<CarDeleteOutcome, AppError> {
        let mut tables = self.tables();
        if !tables.cars.contains_key(&id) {
            return Ok(CarDeleteOutcome::NotFound);
        }

        let bookings = tables.bookings.values().filter(|b| b.car_id == id).count() as i64;
        if bookings > 0 {
            return Ok(CarDeleteOutcome::HasBookings(bookings));
        }

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut tables.scans)
            .into_iter()
            .partition(|s| s.entity_kind == EntityKind::Car && s.entity_id == id);
        tables.scans = kept;
        let scans = removed.len() as u64;
        let storage_keys = removed.into_iter().map(|s| s.storage_key).collect();

        let before = tables.sessions.len();
        tables
            .sessions
            .retain(|_, s| !(s.kind == EntityKind::Car && s.entity_id == id));
        let sessions = (before - tables.sessions.len()) as u64;

        let before = tables.tokens.len();
        tables
            .tokens
            .retain(|_, t| !(t.kind == EntityKind::Car && t.entity_id == id));
        let tokens = (before - tables.tokens.len()) as u64;

        tables.cars.remove(&id);

        Ok(CarDeleteOutcome::Deleted(CarDeletion {
            scans,
            sessions,
            tokens,
            storage_keys,
        }))
    }
}

#[async_trait]
impl UploadTokenRepository for InMemoryStore {
    async fn create(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
        nonce: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<UploadToken, AppError> {
        let token = UploadToken {
            id: Uuid::new_v4(),
            kind,
            entity_id,
            nonce: nonce.to_string(),
            expires_at,
            used_at: None,
            created_at: Utc::now(),
        };
        self.tables()
            .tokens
            .insert((kind, token.id), token.clone());
        Ok(token)
    }

    async fn get(&self, kind: EntityKind, id: Uuid) -> Result<Option<UploadToken>, AppError> {
        Ok(self.tables().tokens.get(&(kind, id)).cloned())
    }

    async fn mark_used(
        &self,
        kind: EntityKind,
        id: Uuid,
        used_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut tables = self.tables();
        Ok(match tables.tokens.get_mut(&(kind, id)) {
            Some(token) if token.used_at.is_none() => {
                token.used_at = Some(used_at);
                true
            }
            _ => false,
        })
    }
}

#[async_trait]
impl UploadSessionRepository for InMemoryStore {
    async fn get_by_token(
        &self,
        kind: EntityKind,
        token_id: Uuid,
    ) -> Result<Option<UploadSession>, AppError> {
        Ok(self
            .tables()
            .sessions
            .values()
            .find(|s| s.kind == kind && s.token_id == token_id)
            .cloned())
    }

    async fn get_or_create(
        &self,
        kind: EntityKind,
        token_id: Uuid,
        entity_id: Uuid,
    ) -> Result<UploadSession, AppError> {
        let mut tables = self.tables();
        if let Some(existing) = tables
            .sessions
            .values()
            .find(|s| s.kind == kind && s.token_id == token_id)
        {
            return Ok(existing.clone());
        }

        let now = Utc::now();
        let session = UploadSession {
            id: Uuid::new_v4(),
            kind,
            token_id,
            entity_id,
            documents: BTreeMap::new(),
            upload_status: UploadStatus::Pending,
            processing_status: ProcessingStatus::Pending,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.sessions.insert((kind, session.id), session.clone());
        Ok(session)
    }

    async fn record_document(
        &self,
        kind: EntityKind,
        session_id: Uuid,
        document_type: DocumentType,
        url: &str,
    ) -> Result<Option<UploadSession>, AppError> {
        if document_type.kind() != kind {
            return Err(AppError::InvalidInput(format!(
                "Document type '{}' is not accepted for a {}",
                document_type, kind
            )));
        }
        let mut tables = self.tables();
        Ok(match tables.sessions.get_mut(&(kind, session_id)) {
            Some(s) if !s.upload_status.is_terminal() => {
                s.documents.insert(document_type, url.to_string());
                if s.upload_status == UploadStatus::Pending {
                    s.upload_status = UploadStatus::Uploading;
                }
                s.updated_at = Utc::now();
                Some(s.clone())
            }
            _ => None,
        })
    }

    async fn set_upload_status(
        &self,
        kind: EntityKind,
        session_id: Uuid,
        status: UploadStatus,
    ) -> Result<bool, AppError> {
        let mut tables = self.tables();
        Ok(match tables.sessions.get_mut(&(kind, session_id)) {
            Some(s) if !s.upload_status.is_terminal() => {
                s.upload_status = status;
                s.updated_at = Utc::now();
                true
            }
            _ => false,
        })
    }

    async fn complete(
        &self,
        kind: EntityKind,
        session_id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<UploadSession>, AppError> {
        let mut tables = self.tables();
        Ok(match tables.sessions.get_mut(&(kind, session_id)) {
            Some(s) if !s.upload_status.is_completed() => {
                s.upload_status = UploadStatus::ManuallyCompleted;
                s.completed_at = Some(completed_at);
                s.updated_at = Utc::now();
                Some(s.clone())
            }
            _ => None,
        })
    }

    async fn list_for_entity(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
    ) -> Result<Vec<UploadSession>, AppError> {
        let mut sessions: Vec<UploadSession> = self
            .tables()
            .sessions
            .values()
            .filter(|s| s.kind == kind && s.entity_id == entity_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }
}

#[async_trait]
impl DocumentScanRepository for InMemoryStore {
    async fn insert(&self, scan: NewDocumentScan) -> Result<DocumentScan, AppError> {
        if self.fail_scan_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Internal(
                "document_scans insert rejected".to_string(),
            ));
        }
        let row = DocumentScan {
            id: Uuid::new_v4(),
            entity_kind: scan.entity_kind,
            entity_id: scan.entity_id,
            session_id: scan.session_id,
            document_type: scan.document_type,
            file_url: scan.file_url,
            storage_key: scan.storage_key,
            created_at: Utc::now(),
        };
        self.tables().scans.push(row.clone());
        Ok(row)
    }

    async fn list_for_entity(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
    ) -> Result<Vec<DocumentScan>, AppError> {
        Ok(self
            .tables()
            .scans
            .iter()
            .filter(|s| s.entity_kind == kind && s.entity_id == entity_id)
            .rev()
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn create(&self, booking: NewBooking) -> Result<Booking, AppError> {
        let mut tables = self.tables();
        if !tables.cars.contains_key(&booking.car_id) {
            return Err(AppError::NotFound("Car not found".to_string()));
        }
        let overlaps = tables.bookings.values().any(|b| {
            b.car_id == booking.car_id
                && matches!(b.status, BookingStatus::Reserved | BookingStatus::Active)
                && b.start_date <= booking.end_date
                && b.end_date >= booking.start_date
        });
        if overlaps {
            return Err(overlap_conflict());
        }

        let now = Utc::now();
        let row = Booking {
            id: Uuid::new_v4(),
            client_id: booking.client_id,
            car_id: booking.car_id,
            start_date: booking.start_date,
            end_date: booking.end_date,
            daily_rate: booking.daily_rate,
            total_amount: booking.total_amount,
            status: booking.status,
            notes: booking.notes,
            created_at: now,
            updated_at: now,
        };
        tables.bookings.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, AppError> {
        Ok(self.tables().bookings.get(&id).cloned())
    }

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, AppError> {
        let mut bookings: Vec<Booking> = self
            .tables()
            .bookings
            .values()
            .filter(|b| filter.status.map_or(true, |s| b.status == s))
            .filter(|b| filter.client_id.map_or(true, |id| b.client_id == id))
            .filter(|b| filter.car_id.map_or(true, |id| b.car_id == id))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| {
            b.start_date
                .cmp(&a.start_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(bookings)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<Option<Booking>, AppError> {
        let mut tables = self.tables();
        Ok(tables.bookings.get_mut(&id).map(|b| {
            b.status = status;
            b.updated_at = Utc::now();
            b.clone()
        }))
    }

    async fn add_payment(
        &self,
        booking_id: Uuid,
        request: &CreatePaymentRequest,
        paid_at: DateTime<Utc>,
    ) -> Result<Payment, AppError> {
        let payment = Payment {
            id: Uuid::new_v4(),
            booking_id,
            amount: request.amount,
            method: request.method,
            reference: request.reference.clone(),
            paid_at,
            created_at: Utc::now(),
        };
        self.tables().payments.push(payment.clone());
        Ok(payment)
    }

    async fn list_payments(&self, booking_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let mut payments: Vec<Payment> = self
            .tables()
            .payments
            .iter()
            .filter(|p| p.booking_id == booking_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| a.paid_at.cmp(&b.paid_at));
        Ok(payments)
    }
}
