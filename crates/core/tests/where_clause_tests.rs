use docsim_core::{Collection, CollectionConfig, Database, Metadata, MetadataValue, Predicate};
use serde_json::json;

struct Employee {
    id: &'static str,
    role: &'static str,
    department: &'static str,
    experience: i64,
    location: &'static str,
    skills: &'static str,
}

const EMPLOYEES: &[Employee] = &[
    Employee {
        id: "employee_1",
        role: "Senior Software Engineer",
        department: "Engineering",
        experience: 10,
        location: "San Francisco",
        skills: "Python, Django, React, PostgreSQL",
    },
    Employee {
        id: "employee_2",
        role: "Engineering Manager",
        department: "Engineering",
        experience: 12,
        location: "Seattle",
        skills: "team leadership, hiring, Go, Kubernetes",
    },
    Employee {
        id: "employee_3",
        role: "Marketing Lead",
        department: "Marketing",
        experience: 8,
        location: "New York",
        skills: "brand strategy, campaigns, analytics",
    },
    Employee {
        id: "employee_4",
        role: "Full-Stack Developer",
        department: "Engineering",
        experience: 4,
        location: "Los Angeles",
        skills: "Python, Flask, Vue, MongoDB",
    },
    Employee {
        id: "employee_5",
        role: "Data Scientist",
        department: "Data",
        experience: 9,
        location: "New York",
        skills: "Python, pandas, scikit-learn, statistics",
    },
    Employee {
        id: "employee_6",
        role: "Sales Director",
        department: "Sales",
        experience: 15,
        location: "Chicago",
        skills: "enterprise sales, negotiation, forecasting",
    },
];

fn employee_collection() -> Collection {
    let db = Database::new();
    let col = db
        .create_collection("employee_collection", CollectionConfig::default())
        .unwrap();
    let ids: Vec<String> = EMPLOYEES.iter().map(|e| e.id.to_string()).collect();
    let texts: Vec<String> = EMPLOYEES
        .iter()
        .map(|e| {
            format!(
                "{} with {} years of experience in {}. Skills: {}. Located in {}.",
                e.role, e.experience, e.department, e.skills, e.location
            )
        })
        .collect();
    let metas: Vec<Metadata> = EMPLOYEES
        .iter()
        .map(|e| {
            let mut m = Metadata::new();
            m.insert("role".into(), e.role.into());
            m.insert("department".into(), e.department.into());
            m.insert("experience".into(), MetadataValue::Integer(e.experience));
            m.insert("location".into(), e.location.into());
            m
        })
        .collect();
    col.add(&ids, &texts, &metas).unwrap();
    col
}

fn get_ids(col: &Collection, clause: serde_json::Value) -> Vec<String> {
    let predicate = Predicate::from_where(&clause).unwrap();
    col.get(Some(&predicate))
        .iter()
        .map(|d| d.id.clone())
        .collect()
}

#[test]
fn test_implicit_equality() {
    let col = employee_collection();
    assert_eq!(
        get_ids(&col, json!({"department": "Engineering"})),
        vec!["employee_1", "employee_2", "employee_4"]
    );
}

#[test]
fn test_numeric_gte() {
    let col = employee_collection();
    assert_eq!(
        get_ids(&col, json!({"experience": {"$gte": 10}})),
        vec!["employee_1", "employee_2", "employee_6"]
    );
    // A float operand compares numerically with integer attributes.
    assert_eq!(
        get_ids(&col, json!({"experience": {"$gte": 9.5}})),
        vec!["employee_1", "employee_2", "employee_6"]
    );
}

#[test]
fn test_in_operator() {
    let col = employee_collection();
    assert_eq!(
        get_ids(
            &col,
            json!({"location": {"$in": ["San Francisco", "Los Angeles"]}})
        ),
        vec!["employee_1", "employee_4"]
    );
}

#[test]
fn test_or_and_nin() {
    let col = employee_collection();
    assert_eq!(
        get_ids(
            &col,
            json!({"$or": [{"department": "Sales"}, {"experience": {"$lt": 5}}]})
        ),
        vec!["employee_4", "employee_6"]
    );
    assert_eq!(
        get_ids(
            &col,
            json!({"department": {"$nin": ["Engineering", "Marketing"]}})
        ),
        vec!["employee_5", "employee_6"]
    );
}

#[test]
fn test_string_does_not_equal_number() {
    let col = employee_collection();
    assert!(get_ids(&col, json!({"experience": "10"})).is_empty());
}

#[test]
fn test_combined_similarity_and_filter() {
    let col = employee_collection();
    let clause = json!({
        "$and": [
            {"experience": {"$gte": 8}},
            {"location": {"$in": ["San Francisco", "New York", "Seattle"]}}
        ]
    });
    let predicate = Predicate::from_where(&clause).unwrap();
    let hits = col
        .query(
            &["senior Python developer full-stack".to_string()],
            5,
            Some(&predicate),
        )
        .unwrap();

    let mut ids: Vec<&str> = hits[0].iter().map(|m| m.id.as_str()).collect();
    assert!(hits[0].windows(2).all(|w| w[0].distance <= w[1].distance));
    ids.sort_unstable();
    assert_eq!(
        ids,
        vec!["employee_1", "employee_2", "employee_3", "employee_5"]
    );
}

#[test]
fn test_delete_where() {
    let col = employee_collection();
    let predicate = Predicate::from_where(&json!({"department": "Engineering"})).unwrap();
    assert_eq!(col.delete_where(&predicate), 3);
    assert_eq!(col.count(), 3);
    assert!(col.get(Some(&predicate)).is_empty());
}

#[test]
fn test_malformed_where_is_rejected() {
    for clause in [
        json!("department"),
        json!({}),
        json!({"rating": {"$between": [1, 2]}}),
        json!({"genre": {"$in": "Fantasy"}}),
        json!({"$and": {"a": 1}}),
        json!({"tags": ["a", "b"]}),
    ] {
        let err = Predicate::from_where(&clause).unwrap_err();
        assert!(err.is_validation(), "{clause} should be rejected");
    }
}

#[test]
fn test_books_search_flow() {
    let db = Database::new();
    let col = db
        .create_collection("book_collection", CollectionConfig::default())
        .unwrap();
    let books = [
        ("book_1", "The Hobbit", "Fantasy", 4.7),
        ("book_2", "1984", "Dystopian", 4.6),
        ("book_3", "Dune", "Science Fiction", 4.3),
        ("book_4", "Brave New World", "Dystopian", 4.0),
        ("book_5", "Twilight", "Romance", 3.6),
    ];
    let ids: Vec<String> = books.iter().map(|b| b.0.to_string()).collect();
    let texts: Vec<String> = books
        .iter()
        .map(|b| format!("{}. Genre: {}.", b.1, b.2))
        .collect();
    let metas: Vec<Metadata> = books
        .iter()
        .map(|b| {
            let mut m = Metadata::new();
            m.insert("title".into(), b.1.into());
            m.insert("genre".into(), b.2.into());
            m.insert("rating".into(), MetadataValue::Float(b.3));
            m
        })
        .collect();
    col.add(&ids, &texts, &metas).unwrap();

    assert_eq!(
        get_ids(
            &col,
            json!({"genre": {"$in": ["Fantasy", "Science Fiction"]}})
        ),
        vec!["book_1", "book_3"]
    );
    assert_eq!(
        get_ids(&col, json!({"rating": {"$gte": 4.3}})),
        vec!["book_1", "book_2", "book_3"]
    );

    let high = Predicate::from_where(&json!({"rating": {"$gte": 4.0}})).unwrap();
    let hits = col
        .query(
            &["dystopian society control oppression future".to_string()],
            3,
            Some(&high),
        )
        .unwrap();
    assert_eq!(hits[0].len(), 3);
    assert!(hits[0]
        .iter()
        .all(|m| m.document.metadata["rating"].as_f64().unwrap_or(0.0) >= 4.0));
}
