// Known inputs with hand-checked expected outputs

/// One grammar issue and one spelling issue
pub const SAMPLE_TEXT: &str = "I could of recieved it.";

/// Expected `check` text output for SAMPLE_TEXT, after the `{path}:` prefix
pub const SAMPLE_EXPECTED: &[&str] = &[
    "1:3: high grammar: Incorrect phrase 'could of' -> could/should/would have",
    "1:12: high spelling: Spelling error 'recieved' -> receive/received/receiving",
];

/// Two short sentences with only short words
pub const EASY_TEXT: &str = "The quick brown fox. It jumps!";

/// Three paragraphs, several issue categories
pub const ESSAY_TEXT: &str = "Its been a long week.  there going home now.

Your doing very good work on a lot of things.

The results occured definately late.";

pub const CSV_TEXT: &str = "name,age,active\nAlice,30,true\nBob,25,false\n";

pub const CSV_EXPECTED_JSON: &str = r#"[
  {
    "name": "Alice",
    "age": 30,
    "active": true
  },
  {
    "name": "Bob",
    "age": 25,
    "active": false
  }
]"#;
