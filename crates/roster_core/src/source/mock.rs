//! In-memory mock store seeded with the dashboard sample dataset.
//!
//! # Invariants
//! - New ids are `len + 1`, skipping ids that are already taken.
//! - Every successful write is published on the feed while the store lock
//!   is held, so feed order matches commit order.
//! - An unavailable store fails every call with `SourceError::Unavailable`.

use crate::config::DEFAULT_AVATAR_URL;
use crate::model::course::Course;
use crate::model::event::ChangeEvent;
use crate::model::student::{Student, StudentDraft, StudentId};
use crate::source::feed::{ChangeFeed, ChangeListener, Subscription};
use crate::source::{DataSource, SourceError, SourceResult};
use log::info;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MockStore {
    students: Vec<Student>,
    courses: Vec<Course>,
    unavailable: bool,
}

/// Cloneable in-memory data source; clones share one store and feed.
#[derive(Debug, Clone)]
pub struct MockDataSource {
    store: Arc<Mutex<MockStore>>,
    feed: ChangeFeed,
    default_avatar: String,
}

impl MockDataSource {
    pub fn new(students: Vec<Student>, courses: Vec<Course>) -> Self {
        Self {
            store: Arc::new(Mutex::new(MockStore {
                students,
                courses,
                unavailable: false,
            })),
            feed: ChangeFeed::new(),
            default_avatar: DEFAULT_AVATAR_URL.to_string(),
        }
    }

    /// Store holding the 8-student, 6-course sample dataset.
    pub fn with_sample_data() -> Self {
        Self::new(sample_students(), sample_courses())
    }

    /// Toggles simulated backend outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Replaces a stored student and publishes `Updated`.
    pub fn update_student(&self, student: Student) -> SourceResult<()> {
        student.validate()?;
        let mut store = self.lock_available()?;
        let Some(slot) = store.students.iter_mut().find(|item| item.id == student.id) else {
            return Err(SourceError::NotFound(student.id));
        };
        *slot = student.clone();
        self.feed.publish(ChangeEvent::Updated(student));
        Ok(())
    }

    /// Removes a stored student and publishes `Deleted`.
    pub fn delete_student(&self, id: &StudentId) -> SourceResult<Student> {
        let mut store = self.lock_available()?;
        let Some(index) = store.students.iter().position(|item| &item.id == id) else {
            return Err(SourceError::NotFound(id.clone()));
        };
        let removed = store.students.remove(index);
        self.feed.publish(ChangeEvent::Deleted(id.clone()));
        Ok(removed)
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    fn lock(&self) -> MutexGuard<'_, MockStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_available(&self) -> SourceResult<MutexGuard<'_, MockStore>> {
        let store = self.lock();
        if store.unavailable {
            return Err(SourceError::Unavailable(
                "mock backend is offline".to_string(),
            ));
        }
        Ok(store)
    }
}

impl DataSource for MockDataSource {
    fn fetch_all_students(&self) -> SourceResult<Vec<Student>> {
        Ok(self.lock_available()?.students.clone())
    }

    fn fetch_student(&self, id: &StudentId) -> SourceResult<Student> {
        self.lock_available()?
            .students
            .iter()
            .find(|student| &student.id == id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(id.clone()))
    }

    fn fetch_all_courses(&self) -> SourceResult<Vec<Course>> {
        Ok(self.lock_available()?.courses.clone())
    }

    fn insert_student(&self, draft: &StudentDraft) -> SourceResult<Student> {
        draft.validate()?;
        let mut store = self.lock_available()?;
        let id = next_student_id(&store.students);
        let student = draft.clone().into_student(id, &self.default_avatar);
        store.students.push(student.clone());
        self.feed.publish(ChangeEvent::Inserted(student.clone()));
        info!(
            "event=student_insert module=source status=ok backend=mock student_id={}",
            student.id
        );
        Ok(student)
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        self.feed.subscribe(listener)
    }
}

fn next_student_id(students: &[Student]) -> StudentId {
    let mut candidate = students.len() + 1;
    loop {
        let id = StudentId::new(candidate.to_string());
        if students.iter().all(|student| student.id != id) {
            return id;
        }
        candidate += 1;
    }
}

/// Sample courses. Store-side counts are stale on purpose; loads recompute
/// them.
pub fn sample_courses() -> Vec<Course> {
    [
        ("1", "Computer Science", 42, "#0EA5E9"),
        ("2", "Data Science", 38, "#10B981"),
        ("3", "Graphic Design", 27, "#F59E0B"),
        ("4", "Business Administration", 53, "#8B5CF6"),
        ("5", "Psychology", 31, "#EC4899"),
        ("6", "Marketing", 29, "#EF4444"),
    ]
    .into_iter()
    .map(|(id, name, count, color)| {
        let mut course = Course::new(id, name, color);
        course.student_count = count;
        course
    })
    .collect()
}

/// Sample students spread over the sample courses.
pub fn sample_students() -> Vec<Student> {
    [
        SampleRow {
            id: "1",
            name: "Emma Johnson",
            course: "Computer Science",
            enrolled: "2023-09-01",
            photo: "photo-1494790108377-be9c29b29330",
            grade: "A",
            attendance: 95,
            bio: "Passionate about AI and machine learning.",
            phone: "555-123-4567",
            address: "123 College Ave, Academic City",
        },
        SampleRow {
            id: "2",
            name: "Liam Smith",
            course: "Data Science",
            enrolled: "2023-08-15",
            photo: "photo-1500648767791-00dcc994a43e",
            grade: "B+",
            attendance: 88,
            bio: "Working on big data projects and visualization.",
            phone: "555-987-6543",
            address: "456 University Blvd, Knowledge Town",
        },
        SampleRow {
            id: "3",
            name: "Olivia Davis",
            course: "Graphic Design",
            enrolled: "2023-09-05",
            photo: "photo-1438761681033-6461ffad8d80",
            grade: "A-",
            attendance: 92,
            bio: "Creative designer with a focus on UI/UX principles.",
            phone: "555-567-8901",
            address: "789 Art Street, Creative Heights",
        },
        SampleRow {
            id: "4",
            name: "Noah Wilson",
            course: "Business Administration",
            enrolled: "2023-08-20",
            photo: "photo-1507003211169-0a1dd7228f2d",
            grade: "B",
            attendance: 85,
            bio: "Entrepreneur with interests in finance and marketing.",
            phone: "555-345-6789",
            address: "101 Business Row, Commerce City",
        },
        SampleRow {
            id: "5",
            name: "Sophia Brown",
            course: "Psychology",
            enrolled: "2023-09-02",
            photo: "photo-1517841905240-472988babdf9",
            grade: "A+",
            attendance: 98,
            bio: "Researching cognitive development in adolescents.",
            phone: "555-234-5678",
            address: "202 Mind Avenue, Psychology Park",
        },
        SampleRow {
            id: "6",
            name: "James Taylor",
            course: "Computer Science",
            enrolled: "2023-08-28",
            photo: "photo-1539571696357-5a69c17a67c6",
            grade: "B+",
            attendance: 89,
            bio: "Software developer specializing in web technologies.",
            phone: "555-876-5432",
            address: "303 Code Lane, Tech Town",
        },
        SampleRow {
            id: "7",
            name: "Isabella Martinez",
            course: "Marketing",
            enrolled: "2023-09-10",
            photo: "photo-1580489944761-15a19d654956",
            grade: "A-",
            attendance: 93,
            bio: "Digital marketing specialist focusing on social media strategies.",
            phone: "555-765-4321",
            address: "404 Market Street, Brand Village",
        },
        SampleRow {
            id: "8",
            name: "Benjamin Lee",
            course: "Data Science",
            enrolled: "2023-08-25",
            photo: "photo-1531427186611-ecfd6d936c79",
            grade: "B",
            attendance: 87,
            bio: "Analyzing trends in consumer behavior through data mining.",
            phone: "555-654-3210",
            address: "505 Data Drive, Analysis Square",
        },
    ]
    .into_iter()
    .map(SampleRow::into_student)
    .collect()
}

struct SampleRow {
    id: &'static str,
    name: &'static str,
    course: &'static str,
    enrolled: &'static str,
    photo: &'static str,
    grade: &'static str,
    attendance: u8,
    bio: &'static str,
    phone: &'static str,
    address: &'static str,
}

impl SampleRow {
    fn into_student(self) -> Student {
        Student {
            id: StudentId::new(self.id),
            email: format!("{}@example.com", self.name.to_lowercase().replace(' ', ".")),
            name: self.name.to_string(),
            course: self.course.to_string(),
            enrollment_date: self.enrolled.to_string(),
            avatar: format!(
                "https://images.unsplash.com/{}?q=80&w=200&auto=format&fit=crop",
                self.photo
            ),
            grade: self.grade.to_string(),
            attendance: self.attendance,
            bio: Some(self.bio.to_string()),
            phone: Some(self.phone.to_string()),
            address: Some(self.address.to_string()),
        }
    }
}
