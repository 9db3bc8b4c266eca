//! Professional licensing exams and the jurisdictions they are offered in.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExamType {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub time_limit_minutes: u32,
    /// As published by the exam body; scales differ between exams.
    pub passing_score: u32,
    pub question_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Jurisdiction {
    pub code: &'static str,
    pub name: &'static str,
}

pub const PROFESSIONAL_EXAMS: [ExamType; 18] = [
    ExamType {
        id: "usmle-step1",
        name: "USMLE Step 1",
        description: "United States Medical Licensing Examination Step 1",
        category: "medical",
        time_limit_minutes: 480,
        passing_score: 194,
        question_count: 280,
    },
    ExamType {
        id: "usmle-step2",
        name: "USMLE Step 2 CK",
        description: "United States Medical Licensing Examination Step 2 Clinical Knowledge",
        category: "medical",
        time_limit_minutes: 540,
        passing_score: 209,
        question_count: 318,
    },
    ExamType {
        id: "nclex-rn",
        name: "NCLEX-RN",
        description: "National Council Licensure Examination for Registered Nurses",
        category: "nursing",
        time_limit_minutes: 300,
        passing_score: 75,
        question_count: 150,
    },
    ExamType {
        id: "nclex-pn",
        name: "NCLEX-PN",
        description: "National Council Licensure Examination for Practical Nurses",
        category: "nursing",
        time_limit_minutes: 300,
        passing_score: 75,
        question_count: 150,
    },
    ExamType {
        id: "bar-exam",
        name: "Bar Examination",
        description: "State Bar Examination for Attorney Licensing",
        category: "legal",
        time_limit_minutes: 720,
        passing_score: 70,
        question_count: 200,
    },
    ExamType {
        id: "mpre",
        name: "MPRE",
        description: "Multistate Professional Responsibility Examination",
        category: "legal",
        time_limit_minutes: 120,
        passing_score: 75,
        question_count: 60,
    },
    ExamType {
        id: "fe-exam",
        name: "FE Exam",
        description: "Fundamentals of Engineering Examination",
        category: "engineering",
        time_limit_minutes: 360,
        passing_score: 70,
        question_count: 110,
    },
    ExamType {
        id: "pe-exam",
        name: "PE Exam",
        description: "Principles and Practice of Engineering Examination",
        category: "engineering",
        time_limit_minutes: 480,
        passing_score: 70,
        question_count: 80,
    },
    ExamType {
        id: "cpa-aud",
        name: "CPA - Auditing",
        description: "Certified Public Accountant - Auditing and Attestation",
        category: "accounting",
        time_limit_minutes: 240,
        passing_score: 75,
        question_count: 72,
    },
    ExamType {
        id: "cpa-far",
        name: "CPA - Financial",
        description: "Certified Public Accountant - Financial Accounting and Reporting",
        category: "accounting",
        time_limit_minutes: 240,
        passing_score: 75,
        question_count: 66,
    },
    ExamType {
        id: "cpa-reg",
        name: "CPA - Regulation",
        description: "Certified Public Accountant - Regulation",
        category: "accounting",
        time_limit_minutes: 240,
        passing_score: 75,
        question_count: 76,
    },
    ExamType {
        id: "cpa-bec",
        name: "CPA - Business",
        description: "Certified Public Accountant - Business Environment and Concepts",
        category: "accounting",
        time_limit_minutes: 240,
        passing_score: 75,
        question_count: 62,
    },
    ExamType {
        id: "real-estate-license",
        name: "Real Estate License",
        description: "State Real Estate Licensing Examination",
        category: "real-estate",
        time_limit_minutes: 180,
        passing_score: 70,
        question_count: 100,
    },
    ExamType {
        id: "naplex",
        name: "NAPLEX",
        description: "North American Pharmacist Licensure Examination",
        category: "pharmacy",
        time_limit_minutes: 285,
        passing_score: 75,
        question_count: 250,
    },
    ExamType {
        id: "are-5",
        name: "ARE 5.0",
        description: "Architect Registration Examination",
        category: "architecture",
        time_limit_minutes: 480,
        passing_score: 70,
        question_count: 95,
    },
    ExamType {
        id: "praxis-core",
        name: "Praxis Core",
        description: "Praxis Core Academic Skills for Educators",
        category: "education",
        time_limit_minutes: 300,
        passing_score: 70,
        question_count: 150,
    },
    ExamType {
        id: "series-7",
        name: "Series 7",
        description: "General Securities Representative Examination",
        category: "finance",
        time_limit_minutes: 225,
        passing_score: 72,
        question_count: 125,
    },
    ExamType {
        id: "series-66",
        name: "Series 66",
        description: "Uniform Combined State Law Examination",
        category: "finance",
        time_limit_minutes: 150,
        passing_score: 73,
        question_count: 100,
    },
];

/// The 50 states plus the District of Columbia.
pub const US_JURISDICTIONS: [Jurisdiction; 51] = [
    Jurisdiction {
        code: "AL",
        name: "Alabama",
    },
    Jurisdiction {
        code: "AK",
        name: "Alaska",
    },
    Jurisdiction {
        code: "AZ",
        name: "Arizona",
    },
    Jurisdiction {
        code: "AR",
        name: "Arkansas",
    },
    Jurisdiction {
        code: "CA",
        name: "California",
    },
    Jurisdiction {
        code: "CO",
        name: "Colorado",
    },
    Jurisdiction {
        code: "CT",
        name: "Connecticut",
    },
    Jurisdiction {
        code: "DE",
        name: "Delaware",
    },
    Jurisdiction {
        code: "FL",
        name: "Florida",
    },
    Jurisdiction {
        code: "GA",
        name: "Georgia",
    },
    Jurisdiction {
        code: "HI",
        name: "Hawaii",
    },
    Jurisdiction {
        code: "ID",
        name: "Idaho",
    },
    Jurisdiction {
        code: "IL",
        name: "Illinois",
    },
    Jurisdiction {
        code: "IN",
        name: "Indiana",
    },
    Jurisdiction {
        code: "IA",
        name: "Iowa",
    },
    Jurisdiction {
        code: "KS",
        name: "Kansas",
    },
    Jurisdiction {
        code: "KY",
        name: "Kentucky",
    },
    Jurisdiction {
        code: "LA",
        name: "Louisiana",
    },
    Jurisdiction {
        code: "ME",
        name: "Maine",
    },
    Jurisdiction {
        code: "MD",
        name: "Maryland",
    },
    Jurisdiction {
        code: "MA",
        name: "Massachusetts",
    },
    Jurisdiction {
        code: "MI",
        name: "Michigan",
    },
    Jurisdiction {
        code: "MN",
        name: "Minnesota",
    },
    Jurisdiction {
        code: "MS",
        name: "Mississippi",
    },
    Jurisdiction {
        code: "MO",
        name: "Missouri",
    },
    Jurisdiction {
        code: "MT",
        name: "Montana",
    },
    Jurisdiction {
        code: "NE",
        name: "Nebraska",
    },
    Jurisdiction {
        code: "NV",
        name: "Nevada",
    },
    Jurisdiction {
        code: "NH",
        name: "New Hampshire",
    },
    Jurisdiction {
        code: "NJ",
        name: "New Jersey",
    },
    Jurisdiction {
        code: "NM",
        name: "New Mexico",
    },
    Jurisdiction {
        code: "NY",
        name: "New York",
    },
    Jurisdiction {
        code: "NC",
        name: "North Carolina",
    },
    Jurisdiction {
        code: "ND",
        name: "North Dakota",
    },
    Jurisdiction {
        code: "OH",
        name: "Ohio",
    },
    Jurisdiction {
        code: "OK",
        name: "Oklahoma",
    },
    Jurisdiction {
        code: "OR",
        name: "Oregon",
    },
    Jurisdiction {
        code: "PA",
        name: "Pennsylvania",
    },
    Jurisdiction {
        code: "RI",
        name: "Rhode Island",
    },
    Jurisdiction {
        code: "SC",
        name: "South Carolina",
    },
    Jurisdiction {
        code: "SD",
        name: "South Dakota",
    },
    Jurisdiction {
        code: "TN",
        name: "Tennessee",
    },
    Jurisdiction {
        code: "TX",
        name: "Texas",
    },
    Jurisdiction {
        code: "UT",
        name: "Utah",
    },
    Jurisdiction {
        code: "VT",
        name: "Vermont",
    },
    Jurisdiction {
        code: "VA",
        name: "Virginia",
    },
    Jurisdiction {
        code: "WA",
        name: "Washington",
    },
    Jurisdiction {
        code: "WV",
        name: "West Virginia",
    },
    Jurisdiction {
        code: "WI",
        name: "Wisconsin",
    },
    Jurisdiction {
        code: "WY",
        name: "Wyoming",
    },
    Jurisdiction {
        code: "DC",
        name: "District of Columbia",
    },
];

pub fn exam_type(id: &str) -> Option<&'static ExamType> {
    PROFESSIONAL_EXAMS.iter().find(|exam| exam.id == id)
}

/// Lookup by two-letter code, case-insensitive.
pub fn jurisdiction(code: &str) -> Option<&'static Jurisdiction> {
    let code = code.trim();
    US_JURISDICTIONS
        .iter()
        .find(|j| j.code.eq_ignore_ascii_case(code))
}

pub fn exams_in_category(category: &str) -> impl Iterator<Item = &'static ExamType> + '_ {
    PROFESSIONAL_EXAMS
        .iter()
        .filter(move |exam| exam.category == category)
}
