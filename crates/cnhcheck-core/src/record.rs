//! Typed identity records extracted from a CNH capture.

use serde::{Deserialize, Serialize};

/// Which capture a record was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentSource {
    /// OCR of the printed card front.
    Front,
    /// The QR/VIO code embedded in the document.
    Qr,
}

impl DocumentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Qr => "qr",
        }
    }
}

/// The identity fields both sources can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityField {
    Name,
    TaxId,
    NationalId,
    BirthDate,
    BirthPlace,
    LicenseCategory,
    IssueDate,
    ExpiryDate,
    RegistrationNumber,
    GuardianName1,
    GuardianName2,
}

impl IdentityField {
    pub const ALL: [IdentityField; 11] = [
        Self::Name,
        Self::TaxId,
        Self::NationalId,
        Self::BirthDate,
        Self::BirthPlace,
        Self::LicenseCategory,
        Self::IssueDate,
        Self::ExpiryDate,
        Self::RegistrationNumber,
        Self::GuardianName1,
        Self::GuardianName2,
    ];

    /// Field name used by the extraction provider.
    pub fn provider_key(&self) -> &'static str {
        match self {
            Self::Name => "nome",
            Self::TaxId => "cpf",
            Self::NationalId => "rg",
            Self::BirthDate => "data_nascimento",
            Self::BirthPlace => "local_nascimento",
            Self::LicenseCategory => "cat_hab",
            Self::IssueDate => "data_emissao",
            Self::ExpiryDate => "data_validade",
            Self::RegistrationNumber => "registro",
            Self::GuardianName1 => "filiacao_1",
            Self::GuardianName2 => "filiacao_2",
        }
    }

    /// Human-readable label for reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::TaxId => "CPF",
            Self::NationalId => "RG",
            Self::BirthDate => "Birth date",
            Self::BirthPlace => "Birth place",
            Self::LicenseCategory => "License category",
            Self::IssueDate => "Issue date",
            Self::ExpiryDate => "Expiry date",
            Self::RegistrationNumber => "CNH registration",
            Self::GuardianName1 => "Parent 1",
            Self::GuardianName2 => "Parent 2",
        }
    }
}

/// Fields only the QR/VIO payload carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QrDetails {
    pub renach_id: Option<String>,
    pub state_code: Option<String>,
    pub city_name: Option<String>,
    pub security_code: Option<String>,
    pub notes: Option<String>,
    pub page_number: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Provider confidence above which an extraction is considered usable.
pub const QUALITY_THRESHOLD: f64 = 0.8;

/// Verdict on the provider's own extraction confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionQuality {
    Approved,
    Rejected,
}

/// Identity data extracted from one document source.
///
/// Every field is optional: the provider omits or nulls whatever it could
/// not read. `qr` is populated only for [`DocumentSource::Qr`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedIdentityRecord {
    pub source: DocumentSource,
    pub name: Option<String>,
    pub tax_id: Option<String>,
    pub national_id: Option<String>,
    pub birth_date: Option<String>,
    pub birth_place: Option<String>,
    pub license_category: Option<String>,
    pub issue_date: Option<String>,
    pub expiry_date: Option<String>,
    pub registration_number: Option<String>,
    pub guardian_name_1: Option<String>,
    pub guardian_name_2: Option<String>,
    pub confidence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr: Option<QrDetails>,
}

impl ExtractedIdentityRecord {
    /// An all-absent record for `source`.
    pub fn empty(source: DocumentSource) -> Self {
        Self {
            source,
            name: None,
            tax_id: None,
            national_id: None,
            birth_date: None,
            birth_place: None,
            license_category: None,
            issue_date: None,
            expiry_date: None,
            registration_number: None,
            guardian_name_1: None,
            guardian_name_2: None,
            confidence_score: None,
            qr: None,
        }
    }

    pub fn get(&self, field: IdentityField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: IdentityField, value: Option<String>) {
        *self.slot_mut(field) = value;
    }

    fn slot(&self, field: IdentityField) -> &Option<String> {
        match field {
            IdentityField::Name => &self.name,
            IdentityField::TaxId => &self.tax_id,
            IdentityField::NationalId => &self.national_id,
            IdentityField::BirthDate => &self.birth_date,
            IdentityField::BirthPlace => &self.birth_place,
            IdentityField::LicenseCategory => &self.license_category,
            IdentityField::IssueDate => &self.issue_date,
            IdentityField::ExpiryDate => &self.expiry_date,
            IdentityField::RegistrationNumber => &self.registration_number,
            IdentityField::GuardianName1 => &self.guardian_name_1,
            IdentityField::GuardianName2 => &self.guardian_name_2,
        }
    }

    fn slot_mut(&mut self, field: IdentityField) -> &mut Option<String> {
        match field {
            IdentityField::Name => &mut self.name,
            IdentityField::TaxId => &mut self.tax_id,
            IdentityField::NationalId => &mut self.national_id,
            IdentityField::BirthDate => &mut self.birth_date,
            IdentityField::BirthPlace => &mut self.birth_place,
            IdentityField::LicenseCategory => &mut self.license_category,
            IdentityField::IssueDate => &mut self.issue_date,
            IdentityField::ExpiryDate => &mut self.expiry_date,
            IdentityField::RegistrationNumber => &mut self.registration_number,
            IdentityField::GuardianName1 => &mut self.guardian_name_1,
            IdentityField::GuardianName2 => &mut self.guardian_name_2,
        }
    }

    /// No name and no CPF: nothing usable was read from the capture.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.tax_id.is_none()
    }

    /// Number of present values, counting the confidence score and QR extras.
    pub fn populated_field_count(&self) -> usize {
        let common = IdentityField::ALL
            .iter()
            .filter(|f| self.get(**f).is_some())
            .count();
        let score = usize::from(self.confidence_score.is_some());
        let extras = self.qr.as_ref().map_or(0, |qr| {
            [
                &qr.renach_id,
                &qr.state_code,
                &qr.city_name,
                &qr.security_code,
                &qr.notes,
            ]
            .iter()
            .filter(|v| v.is_some())
            .count()
                + usize::from(qr.page_number.is_some())
                + usize::from(!qr.tags.is_empty())
        });
        common + score + extras
    }

    /// Quality verdict from the provider confidence. A missing score is rejected.
    pub fn quality(&self) -> ExtractionQuality {
        match self.confidence_score {
            Some(score) if score > QUALITY_THRESHOLD => ExtractionQuality::Approved,
            _ => ExtractionQuality::Rejected,
        }
    }
}
