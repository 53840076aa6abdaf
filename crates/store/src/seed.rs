//! Demo data for local development and end-to-end tests.
//!
//! Every record has a fixed id, so seeding twice leaves the same data.

use campusdesk_core::actor::{Role, UserRecord};
use campusdesk_core::catalog::{
    Building, Course, CourseOffering, Department, FeeCatalog, FeeItem, Quiz, QuizQuestion,
};
use campusdesk_core::error::StoreError;
use campusdesk_core::news::{Audience, News};
use campusdesk_core::store::CampusStore;
use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

/// How many records of each kind were written.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub users: usize,
    pub buildings: usize,
    pub departments: usize,
    pub courses: usize,
    pub news: usize,
    pub fee_catalogs: usize,
    pub quizzes: usize,
}

fn user(id: &str, name: &str, role: Role, department: Option<&str>, courses: &[&str]) -> UserRecord {
    UserRecord {
        id: id.into(),
        name: name.into(),
        email: format!("{id}@campus.example.edu"),
        role,
        department: department.map(String::from),
        courses: courses.iter().map(|c| c.to_string()).collect(),
        active: true,
    }
}

fn users() -> Vec<UserRecord> {
    vec![
        user("admin", "System Administrator", Role::SystemAdmin, None, &[]),
        user("bursar", "Bursary Office", Role::BursaryAdmin, None, &[]),
        user("cs-admin", "CS Department Office", Role::DepartmentalAdmin, Some("cs"), &[]),
        user("lect-okafor", "Dr. Chidi Okafor", Role::LecturerAdmin, Some("cs"), &["csc101"]),
        user("staff-bello", "Mr. Tunde Bello", Role::Staff, Some("math"), &[]),
        user("stu-ada", "Ada Nwosu", Role::Student, Some("cs"), &["csc101", "mth101"]),
        user("stu-musa", "Musa Ibrahim", Role::Student, Some("math"), &["mth101"]),
    ]
}

fn building(id: &str, name: &str, description: &str, location: &str, facilities: &[&str]) -> Building {
    Building {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        location: Some(location.into()),
        latitude: None,
        longitude: None,
        facilities: facilities.iter().map(|f| f.to_string()).collect(),
        active: true,
    }
}

fn buildings() -> Vec<Building> {
    vec![
        building(
            "library",
            "University Library",
            "Main library with reading rooms, e-library and archives",
            "Central campus, opposite the Senate Building",
            &["reading rooms", "e-library", "wifi"],
        ),
        building(
            "senate",
            "Senate Building",
            "Administrative headquarters: registry, bursary and the Vice-Chancellor's office",
            "Central campus, main roundabout",
            &["registry", "bursary"],
        ),
        building(
            "science-complex",
            "Faculty of Science Complex",
            "Lecture theatres and laboratories for the science departments",
            "North campus, behind the chapel",
            &["lecture theatres", "laboratories"],
        ),
        building(
            "ict-centre",
            "ICT Centre",
            "Computer laboratories and student portal support",
            "North campus, beside the Science Complex",
            &["computer labs", "help desk"],
        ),
        building(
            "sports",
            "Sports Complex",
            "Stadium, indoor courts and gym",
            "South campus",
            &["stadium", "gym"],
        ),
    ]
}

fn departments() -> Vec<Department> {
    vec![
        Department {
            id: "cs".into(),
            name: "Computer Science".into(),
            code: "CSC".into(),
            faculty: "Science".into(),
            description: "Computing, software engineering and information systems".into(),
            hod: Some("Prof. Adaeze Eze".into()),
            location: Some("ICT Centre, first floor".into()),
            active: true,
        },
        Department {
            id: "math".into(),
            name: "Mathematics".into(),
            code: "MTH".into(),
            faculty: "Science".into(),
            description: "Pure and applied mathematics, statistics".into(),
            hod: Some("Prof. Kunle Adeyemi".into()),
            location: Some("Faculty of Science Complex, block B".into()),
            active: true,
        },
    ]
}

fn offering(department: &str, level: u16, lecturers: &[&str], compulsory: bool) -> CourseOffering {
    CourseOffering {
        department: department.into(),
        level,
        semester: Some("first".into()),
        lecturers: lecturers.iter().map(|l| l.to_string()).collect(),
        compulsory,
        added_by: Some("admin".into()),
        updated_at: None,
    }
}

fn courses() -> Vec<Course> {
    vec![
        Course {
            id: "csc101".into(),
            code: "CSC 101".into(),
            title: "Introduction to Computer Science".into(),
            description: "Problem solving, algorithms and programming fundamentals".into(),
            credit_units: 3,
            level: 100,
            department: "cs".into(),
            departments_offering: vec![
                offering("cs", 100, &["lect-okafor"], true),
                offering("math", 100, &["lect-okafor"], false),
            ],
            active: true,
        },
        Course {
            id: "csc201".into(),
            code: "CSC 201".into(),
            title: "Data Structures".into(),
            description: "Lists, trees, graphs and their algorithms".into(),
            credit_units: 3,
            level: 200,
            department: "cs".into(),
            departments_offering: vec![offering("cs", 200, &[], true)],
            active: true,
        },
        Course {
            id: "mth101".into(),
            code: "MTH 101".into(),
            title: "Elementary Mathematics I".into(),
            description: "Sets, functions, algebra and trigonometry".into(),
            credit_units: 3,
            level: 100,
            department: "math".into(),
            departments_offering: vec![
                offering("math", 100, &[], true),
                offering("cs", 100, &[], true),
            ],
            active: true,
        },
    ]
}

fn news() -> Vec<News> {
    let now = Utc::now();
    let item = |id: &str, title: &str, content: &str, audience: Audience, age_hours: i64| News {
        id: id.into(),
        title: title.into(),
        content: content.into(),
        audience,
        department: None,
        courses: vec![],
        tags: vec![],
        author: "admin".into(),
        active: true,
        created_at: now - Duration::hours(age_hours),
        updated_at: now - Duration::hours(age_hours),
    };

    let mut dept = item(
        "news-cs-seminar",
        "CS departmental seminar",
        "All Computer Science students and staff are invited to Friday's seminar.",
        Audience::DepartmentSpecific,
        3,
    );
    dept.department = Some("cs".into());
    dept.author = "cs-admin".into();

    let mut course = item(
        "news-csc101-test",
        "CSC 101 continuous assessment",
        "The first CSC 101 test holds next Tuesday in the ICT Centre.",
        Audience::CourseSpecific,
        2,
    );
    course.courses = vec!["csc101".into()];
    course.author = "lect-okafor".into();
    course.tags = vec!["academics".into()];

    let mut sports = item(
        "news-sports",
        "Inter-faculty games",
        "Registration for the inter-faculty games closes on Friday.",
        Audience::Everyone,
        1,
    );
    sports.tags = vec!["sports".into()];

    vec![
        item(
            "news-welcome",
            "Welcome to the new session",
            "Lectures begin on Monday. Check your departmental timetable.",
            Audience::Everyone,
            48,
        ),
        item(
            "news-exams",
            "Examination timetable released",
            "The first-semester examination timetable is available at the registry.",
            Audience::StudentsOnly,
            24,
        ),
        item(
            "news-staff-meeting",
            "Congregation meeting",
            "Academic staff congregation meets on Thursday at the Senate Building.",
            Audience::StaffOnly,
            12,
        ),
        dept,
        course,
        sports,
    ]
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn fee_catalogs() -> Vec<FeeCatalog> {
    let catalog = |id: &str, level: &str, session: &str, effective: NaiveDate, tuition: f64| FeeCatalog {
        id: id.into(),
        level: level.into(),
        session: session.into(),
        currency: "NGN".into(),
        effective_date: effective,
        items: vec![
            FeeItem {
                name: "Tuition".into(),
                amount: tuition,
            },
            FeeItem {
                name: "Library".into(),
                amount: 5_000.0,
            },
            FeeItem {
                name: "ICT".into(),
                amount: 7_500.0,
            },
        ],
        is_new: true,
        active: true,
        created_at: Utc::now(),
    };

    vec![
        catalog("fees-100-2024", "100", "2024/2025", date(2024, 9, 1), 45_000.0),
        catalog("fees-100-2025", "100", "2025/2026", date(2025, 9, 1), 50_000.0),
        catalog("fees-200-2025", "200", "2025/2026", date(2025, 9, 1), 55_000.0),
    ]
}

fn quizzes() -> Vec<Quiz> {
    vec![Quiz {
        id: "quiz-csc101-1".into(),
        course: "csc101".into(),
        title: "CSC 101 warm-up".into(),
        questions: vec![
            QuizQuestion {
                prompt: "Which of these is a programming language?".into(),
                options: vec!["HTML".into(), "Rust".into(), "HTTP".into()],
                answer: Some(1),
            },
            QuizQuestion {
                prompt: "An algorithm is...".into(),
                options: vec![
                    "a finite sequence of steps".into(),
                    "a kind of computer".into(),
                    "a network protocol".into(),
                ],
                answer: Some(0),
            },
        ],
        active: true,
    }]
}

/// Write the demo data set into `store`.
pub async fn seed_demo(store: &dyn CampusStore) -> Result<SeedReport, StoreError> {
    let mut report = SeedReport::default();

    for record in users() {
        store.upsert_user(record).await?;
        report.users += 1;
    }
    for record in buildings() {
        store.upsert_building(record).await?;
        report.buildings += 1;
    }
    for record in departments() {
        store.upsert_department(record).await?;
        report.departments += 1;
    }
    for record in courses() {
        store.upsert_course(record).await?;
        report.courses += 1;
    }
    for record in news() {
        store.upsert_news(record).await?;
        report.news += 1;
    }
    for record in fee_catalogs() {
        store.upsert_fee_catalog(record).await?;
        report.fee_catalogs += 1;
    }
    for record in quizzes() {
        store.upsert_quiz(record).await?;
        report.quizzes += 1;
    }

    info!(store = store.name(), ?report, "Seeded demo data");
    Ok(report)
}
