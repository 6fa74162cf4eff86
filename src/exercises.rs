#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exercise {
    pub title: &'static str,
    pub starter_code: &'static str,
    pub solution_code: &'static str,
}

pub const CATALOG: &[Exercise] = &[
    Exercise {
        title: "Exercise 1: Make Character Run",
        starter_code: r#"# Stop every clip, then play the one called "run".
mixer stop-all
mixer play run
"#,
        solution_code: r#"if bound mixer lib
    mixer stop-all
    if clip run
        mixer play run
    else
        warn "'run' animation clip not found."
    end
end
"#,
    },
    Exercise {
        title: "Exercise 2: Make Character Jump",
        starter_code: r#"# Play "jump" once. When it finishes, go back to "idle".
mixer stop-all
mixer play jump --once
"#,
        solution_code: r#"if bound mixer lib
    mixer stop-all
    if clip jump
        mixer play jump --once
        if clip idle
            mixer then idle
        end
    else
        warn "'jump' animation clip not found."
    end
end
"#,
    },
    Exercise {
        title: "Exercise 3: Make Character Fall",
        starter_code: r#"# Play "fall" if the model has it.
# Otherwise lay the character down by hand with `model rotation` and `model position`.
mixer stop-all
if clip fall
    mixer play fall
end
"#,
        solution_code: r#"if bound mixer lib model
    mixer stop-all
    if clip fall
        mixer play fall
    else
        warn "'fall' animation clip not found. Using a generic pose."
        model rotation 90 0 0
        model position 0 -0.5 0
    end
end
"#,
    },
    Exercise {
        title: "Exercise 4: Make Character Run Faster",
        starter_code: r#"# Same as running, but twice as fast. Try `mixer speed run 2`.
mixer stop-all
mixer play run
"#,
        solution_code: r#"if bound mixer lib
    mixer stop-all
    if clip run
        mixer play run --speed 2
    else
        warn "'run' animation clip not found."
    end
end
"#,
    },
    Exercise {
        title: "Exercise 5: Make Character Walk Back",
        starter_code: r#"# Play "walk" and move the model away from the camera a little every frame.
mixer stop-all
mixer play walk
"#,
        solution_code: r#"if bound mixer lib model
    mixer stop-all
    if clip walk
        mixer play walk --speed 1
        model move 0 0 0.05 --frames 200
    else
        warn "'walk' animation clip not found."
    end
end
"#,
    },
    Exercise {
        title: "Exercise 6: Make Character Walk Ahead",
        starter_code: r#"# Play "walk" and move the model towards the camera a little every frame.
mixer stop-all
mixer play walk
"#,
        solution_code: r#"if bound mixer lib model
    mixer stop-all
    if clip walk
        mixer play walk --speed 1
        model move 0 0 -0.05 --frames 200
    else
        warn "'walk' animation clip not found."
    end
end
"#,
    },
    Exercise {
        title: "Exercise 7: Orbit the Camera",
        starter_code: r#"# Turn on orbit controls so the camera circles the character.
camera look-at model
camera orbit
"#,
        solution_code: r#"if bound camera model
    camera position 0 4 12
    camera look-at model
    camera orbit --damping 0.1 --auto-rotate 30
end
"#,
    },
    Exercise {
        title: "Exercise 8: Add a Ground Plane",
        starter_code: r#"# Give the character something to stand on.
scene add ground
"#,
        solution_code: r#"scene add ground --size 40 --color 88aa66
scene add grid --size 40 --divisions 40
scene add light point --intensity 0.6 --at 0 6 4
"#,
    },
    Exercise {
        title: "Exercise 9: Pulse the Scale",
        starter_code: r#"# Make the character breathe: its scale should grow and shrink forever.
model pulse
"#,
        solution_code: r#"if bound model
    model pulse --amplitude 0.15 --period 1.5
end
"#,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ScriptExecutor;

    #[test]
    fn every_snippet_compiles() {
        let executor = ScriptExecutor::new();
        for exercise in CATALOG {
            for code in [exercise.starter_code, exercise.solution_code] {
                if let Err(e) = executor.compile(code) {
                    panic!("{}: {}", exercise.title, e);
                }
            }
        }
    }

    #[test]
    fn titles_are_numbered_in_order() {
        for (i, exercise) in CATALOG.iter().enumerate() {
            assert!(exercise.title.starts_with(&format!("Exercise {}:", i + 1)));
            assert_ne!(exercise.starter_code, exercise.solution_code);
        }
    }

    #[test]
    fn catalog_starts_with_run() {
        assert_eq!(CATALOG.first().map(|e| e.title), Some("Exercise 1: Make Character Run"));
    }
}
