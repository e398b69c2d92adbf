/// Source a code buffer is seeded with when the learner has no prior answer.
pub fn starter_template(language: &str) -> &'static str {
    match language.trim().to_ascii_lowercase().as_str() {
        "python" | "python3" | "py" => {
            "def solve():\n    # Read input and print the answer\n    pass\n\n\nif __name__ == \"__main__\":\n    solve()\n"
        }
        "javascript" | "js" | "node" => {
            "const lines = require(\"fs\").readFileSync(0, \"utf8\").split(\"\\n\");\n\nfunction solve(lines) {\n  // Read input and print the answer\n}\n\nsolve(lines);\n"
        }
        "typescript" | "ts" => {
            "import { readFileSync } from \"fs\";\n\nconst lines: string[] = readFileSync(0, \"utf8\").split(\"\\n\");\n\nfunction solve(lines: string[]): void {\n  // Read input and print the answer\n}\n\nsolve(lines);\n"
        }
        "java" => {
            "import java.util.*;\n\npublic class Main {\n    public static void main(String[] args) {\n        Scanner in = new Scanner(System.in);\n        // Read input and print the answer\n    }\n}\n"
        }
        "c++" | "cpp" => {
            "#include <bits/stdc++.h>\nusing namespace std;\n\nint main() {\n    // Read input and print the answer\n    return 0;\n}\n"
        }
        "c" => "#include <stdio.h>\n\nint main(void) {\n    /* Read input and print the answer */\n    return 0;\n}\n",
        "go" | "golang" => {
            "package main\n\nimport \"fmt\"\n\nfunc main() {\n\t// Read input and print the answer\n\tfmt.Println()\n}\n"
        }
        "rust" | "rs" => "use std::io::{self, Read};\n\nfn main() {\n    let mut input = String::new();\n    io::stdin().read_to_string(&mut input).unwrap();\n    // Print the answer\n}\n",
        _ => "",
    }
}
