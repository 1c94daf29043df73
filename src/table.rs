use pad::PadStr;

pub struct Table {
    ncol: usize,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn with_capacity(size: usize) -> Table {
        Table {
            ncol: 0,
            rows: Vec::with_capacity(size),
        }
    }

    /// The first row added is the title row. Rows shorter than the title row are
    /// padded with empty cells, longer ones are truncated.
    pub fn add(&mut self, mut row: Vec<String>) {
        if self.ncol == 0 {
            self.ncol = row.len();
        }
        row.resize(self.ncol, String::new());
        self.rows.push(row);
    }

    pub fn render(&self) -> String {
        let mut pads = Vec::with_capacity(self.ncol);
        for coli in 0..self.ncol {
            let max_size = self
                .rows
                .iter()
                .map(|row| console::measure_text_width(&row[coli]))
                .max()
                .unwrap_or(0);
            pads.push(max_size);
        }

        let mut split = String::from("+");
        for pad in pads.iter() {
            split.push_str(&"-".repeat(*pad + 2));
            split.push('+');
        }

        let mut out = String::new();
        for (rowi, row) in self.rows.iter().enumerate() {
            if rowi == 0 {
                out.push_str(&split);
                out.push('\n');
            }
            out.push('|');
            for (coli, cell) in row.iter().enumerate() {
                let text = cell.pad_to_width_with_alignment(pads[coli], pad::Alignment::Left);
                out.push_str(&format!(" {text} |"));
            }
            out.push('\n');

            if rowi == 0 {
                out.push_str(&split);
                out.push('\n');
            }
        }
        out.push_str(&split);
        out
    }

    pub fn show(&self) {
        println!("{}", self.render());
    }
}
